// Scripted landmark source for exercising the host pipeline without a
// camera: the iris pair sweeps a slow figure, and every few seconds the
// hand closes into a pinch.

use anyhow::Result;
use api::{LandmarkFrame, LandmarkModule, LandmarkUpdate, ModuleLogger, Region};
use glam::Vec3;
use std::time::Duration;

const HAND_POINTS: usize = 21;
const PINCH_PERIOD_S: f32 = 4.0;
const PINCH_HOLD_S: f32 = 0.5;

pub struct SyntheticSource {
    frame_count: u64,
    logger: Option<ModuleLogger>,
}

impl SyntheticSource {
    fn new() -> Self {
        Self {
            frame_count: 0,
            logger: None,
        }
    }

    fn eye_frame(&self, now: Duration) -> LandmarkFrame {
        let t = now.as_secs_f32() * 0.2;
        let center = Vec3::new(0.5 + 0.05 * t.sin(), 0.5 + 0.04 * (t * 0.7).cos(), 0.0);
        // Two iris centers a small pupil distance apart.
        let offset = Vec3::new(0.03, 0.0, 0.0);
        LandmarkFrame::new(
            Region::Eye,
            vec![center - offset, center + offset],
            now,
            0.95,
        )
    }

    fn hand_frame(&self, now: Duration) -> LandmarkFrame {
        let phase = now.as_secs_f32() % PINCH_PERIOD_S;
        let pinching = phase < PINCH_HOLD_S;

        let wrist = Vec3::new(0.7, 0.7, 0.0);
        let mut points = vec![wrist; HAND_POINTS];

        // Knuckles fan out above the wrist.
        for (i, point) in points.iter_mut().enumerate().skip(1) {
            let finger = ((i - 1) / 4) as f32;
            let joint = ((i - 1) % 4 + 1) as f32;
            let spread = (finger - 2.0) * 0.03;
            *point = wrist + Vec3::new(spread, -0.04 * joint, 0.0);
        }

        if pinching {
            // Thumb and index tips meet.
            let meet = wrist + Vec3::new(0.0, -0.12, 0.0);
            points[4] = meet;
            points[8] = meet + Vec3::new(0.005, 0.0, 0.0);
        }

        LandmarkFrame::new(Region::Hand, points, now, 0.9)
    }
}

impl LandmarkModule for SyntheticSource {
    fn initialize(&mut self, logger: ModuleLogger) -> Result<()> {
        logger.info("Synthetic landmark source ready");
        self.logger = Some(logger);
        Ok(())
    }

    fn update(&mut self, frames: &mut LandmarkUpdate, now: Duration) -> Result<()> {
        self.frame_count += 1;

        frames.eye = Some(self.eye_frame(now));
        frames.hand = Some(self.hand_frame(now));

        if let Some(logger) = &self.logger {
            if self.frame_count == 1 {
                logger.info("First synthetic frame emitted");
            } else if self.frame_count == 1000 {
                logger.info("Frame 1000 milestone");
            }
        }

        Ok(())
    }

    fn unload(&mut self) {
        if let Some(logger) = &self.logger {
            logger.info(&format!(
                "Synthetic source unloading after {} frames",
                self.frame_count
            ));
        }
    }
}

#[no_mangle]
#[allow(improper_ctypes_definitions)]
pub extern "C" fn create_module() -> *mut dyn LandmarkModule {
    Box::into_raw(Box::new(SyntheticSource::new()))
}
