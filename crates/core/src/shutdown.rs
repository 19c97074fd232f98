//! Ordered teardown of a running overlay.

use crate::{
    landmarks::LandmarkDetector,
    render::{RenderCycle, VideoSurface},
    settings::SettingsController,
    store::Autosaver,
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    /// Settings stop taking writes and audio capture ends.
    StopAudio,
    /// The last pending change is written to the autosave slot.
    FlushSettings,
    ReleaseVideo,
    CloseDetector,
}

/// Outcome of every step, in the order the steps ran.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub steps: Vec<(ShutdownStep, Option<String>)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|(_, err)| err.is_none())
    }

    pub fn failed(&self) -> impl Iterator<Item = ShutdownStep> + '_ {
        self.steps
            .iter()
            .filter(|(_, err)| err.is_some())
            .map(|(step, _)| *step)
    }

    fn record(&mut self, step: ShutdownStep, result: Result<()>) {
        let error = result.err().map(|err| {
            tracing::warn!(?step, %err, "shutdown step failed");
            err.to_string()
        });
        self.steps.push((step, error));
    }
}

/// Stops audio, flushes settings, releases video and closes the detector,
/// in that order. Every step runs even when an earlier one fails.
pub fn shutdown<D, S>(
    controller: &SettingsController,
    autosaver: Autosaver,
    cycle: &mut RenderCycle<D, S>,
) -> ShutdownReport
where
    D: LandmarkDetector,
    S: VideoSurface,
{
    let mut report = ShutdownReport::default();

    controller.close();
    report.record(ShutdownStep::StopAudio, Ok(()));

    let flushed = autosaver.flush();
    autosaver.shutdown();
    report.record(ShutdownStep::FlushSettings, flushed);

    report.record(ShutdownStep::ReleaseVideo, cycle.release_surface());
    report.record(ShutdownStep::CloseDetector, cycle.close_detector());

    tracing::debug!(clean = report.is_clean(), "shutdown finished");
    report
}
