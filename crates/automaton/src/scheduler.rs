//! Frame sequencing and lifecycle.
//!
//! [`FrameScheduler`] owns every per-instance resource and runs the fixed
//! per-frame sequence. [`Pipeline`] is the public lifecycle surface on top of
//! it and accepts resize requests from other threads through a
//! [`ResizeHandle`].

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, PipelineError};
use crate::grid::{Extent, Grid};
use crate::interaction::InteractionStage;
use crate::kernel::{KernelImage, KernelTaps};
use crate::params::{Parameters, PointerState};
use crate::present::PresentStage;
use crate::store::StateStore;
use crate::update::UpdateStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    Uninitialized,
    Running,
    Resetting,
}

/// Monotonic frame index; reset to zero by a cold reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameCounter(u64);

impl FrameCounter {
    pub fn get(self) -> u64 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// When the kernel is rebuilt after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KernelPolicy {
    /// Rebuild between frames whenever the kernel-shaping parameters change.
    #[default]
    Track,
    /// Keep the kernel built at construction or the last reset.
    Frozen,
}

#[derive(Debug)]
struct Resources {
    store: StateStore,
    update: UpdateStage,
    present: PresentStage,
}

impl Resources {
    fn allocate(extent: Extent, kernel_source: &Parameters) -> Result<Self, AllocationError> {
        let store = StateStore::new(extent)?;
        let present = PresentStage::new(extent)?;
        let update = UpdateStage::new(build_taps(kernel_source));
        Ok(Self {
            store,
            update,
            present,
        })
    }
}

fn build_taps(params: &Parameters) -> KernelTaps {
    let image = KernelImage::generate(
        params.outer_radius,
        params.ratio_of_radii,
        params.kernel_profile,
    );
    KernelTaps::from_image(&image)
}

/// Drives the interaction, update and present stages once per frame.
#[derive(Debug)]
pub struct FrameScheduler {
    state: SchedulerState,
    policy: KernelPolicy,
    extent: Extent,
    kernel_source: Parameters,
    counter: FrameCounter,
    resources: Option<Resources>,
}

impl FrameScheduler {
    pub fn new(policy: KernelPolicy) -> Self {
        Self {
            state: SchedulerState::Uninitialized,
            policy,
            extent: Extent::new(0, 0),
            kernel_source: Parameters::default(),
            counter: FrameCounter::default(),
            resources: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn policy(&self) -> KernelPolicy {
        self.policy
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn frame(&self) -> u64 {
        self.counter.get()
    }

    pub fn kernel(&self) -> Option<&KernelTaps> {
        self.resources.as_ref().map(|r| r.update.taps())
    }

    /// Read buffer of the last completed frame.
    pub fn current(&self) -> Option<&Grid> {
        self.resources.as_ref().map(|r| r.store.current_read())
    }

    /// First allocation: `Uninitialized → Running`.
    pub fn allocate(&mut self, extent: Extent, params: &Parameters) -> Result<(), PipelineError> {
        if self.state != SchedulerState::Uninitialized {
            return Err(PipelineError::NotRunning(self.state));
        }
        self.kernel_source = *params;
        self.resources = Some(Resources::allocate(extent, &self.kernel_source)?);
        self.extent = extent;
        self.counter.reset();
        self.state = SchedulerState::Running;
        tracing::info!(width = extent.width, height = extent.height, "pipeline running");
        Ok(())
    }

    /// Cold reset at a new extent: `Running → Resetting → Running`.
    ///
    /// A request for the current extent is ignored. If allocation fails the
    /// scheduler stays in `Resetting` and refuses every later frame.
    pub fn reset(&mut self, extent: Extent) -> Result<(), PipelineError> {
        if self.state != SchedulerState::Running {
            return Err(PipelineError::NotRunning(self.state));
        }
        if extent == self.extent {
            tracing::debug!(%extent, "resize to current extent ignored");
            return Ok(());
        }

        self.state = SchedulerState::Resetting;
        self.resources = None;
        match Resources::allocate(extent, &self.kernel_source) {
            Ok(resources) => {
                self.resources = Some(resources);
                self.extent = extent;
                self.counter.reset();
                self.state = SchedulerState::Running;
                tracing::info!(width = extent.width, height = extent.height, "pipeline reset");
                Ok(())
            }
            Err(err) => {
                tracing::error!(%extent, error = %err, "pipeline reset failed");
                Err(err.into())
            }
        }
    }

    /// Runs one frame and returns the presented grid.
    pub fn run_frame(
        &mut self,
        params: Parameters,
        pointer: PointerState,
    ) -> Result<&Grid, PipelineError> {
        if self.state != SchedulerState::Running {
            return Err(PipelineError::NotRunning(self.state));
        }
        let Some(resources) = self.resources.as_mut() else {
            return Err(PipelineError::NotRunning(self.state));
        };

        if self.policy == KernelPolicy::Track && params.kernel_differs(&self.kernel_source) {
            self.kernel_source = params;
            resources.update = UpdateStage::new(build_taps(&params));
            tracing::debug!(
                outer_radius = params.outer_radius,
                ratio = params.ratio_of_radii,
                "kernel regenerated"
            );
        }

        let frame = self.counter.get();
        let Resources {
            store,
            update,
            present,
        } = resources;

        let interaction = InteractionStage::plan(&params, pointer, frame);
        if interaction.is_active() {
            let (read, write) = store.split();
            interaction.apply(read, write);
            store.promote_write();
        }

        let (read, write) = store.split();
        update.apply(&params, read, write);
        present.present(write);

        store.swap();
        self.counter.increment();
        Ok(present.output())
    }
}

/// Thread-safe sender for deferred resize requests.
#[derive(Debug, Clone)]
pub struct ResizeHandle {
    tx: Sender<Extent>,
}

impl ResizeHandle {
    /// Queues a resize for the next frame boundary. Returns `false` once the
    /// pipeline has been dropped.
    pub fn request(&self, width: u32, height: u32) -> bool {
        self.tx.send(Extent::new(width, height)).is_ok()
    }
}

/// Lifecycle surface of the CPU simulation.
#[derive(Debug)]
pub struct Pipeline {
    scheduler: FrameScheduler,
    resize_tx: Sender<Extent>,
    resize_rx: Receiver<Extent>,
}

impl Pipeline {
    pub fn initialize(width: u32, height: u32, params: &Parameters) -> Result<Self, PipelineError> {
        Self::with_policy(width, height, params, KernelPolicy::default())
    }

    pub fn with_policy(
        width: u32,
        height: u32,
        params: &Parameters,
        policy: KernelPolicy,
    ) -> Result<Self, PipelineError> {
        let mut scheduler = FrameScheduler::new(policy);
        if let Err(err) = scheduler.allocate(Extent::new(width, height), params) {
            tracing::error!(width, height, error = %err, "pipeline initialization failed");
            return Err(err);
        }
        let (resize_tx, resize_rx) = crossbeam_channel::unbounded();
        Ok(Self {
            scheduler,
            resize_tx,
            resize_rx,
        })
    }

    /// Advances one frame. Pending resize requests are applied first; the
    /// most recent one wins.
    pub fn tick(&mut self, params: Parameters, pointer: PointerState) -> Result<&Grid, PipelineError> {
        if let Some(extent) = self.resize_rx.try_iter().last() {
            self.scheduler.reset(extent)?;
        }
        self.scheduler.run_frame(params, pointer)
    }

    /// Applies a resize immediately; no frame can be in flight while `self`
    /// is exclusively borrowed.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        // Requests queued before this call are superseded.
        self.resize_rx.try_iter().for_each(drop);
        self.scheduler.reset(Extent::new(width, height))
    }

    pub fn resize_handle(&self) -> ResizeHandle {
        ResizeHandle {
            tx: self.resize_tx.clone(),
        }
    }

    pub fn destroy(self) {
        tracing::debug!(frame = self.scheduler.frame(), "pipeline destroyed");
    }

    pub fn frame(&self) -> u64 {
        self.scheduler.frame()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn extent(&self) -> Extent {
        self.scheduler.extent()
    }

    pub fn policy(&self) -> KernelPolicy {
        self.scheduler.policy()
    }

    pub fn kernel(&self) -> Option<&KernelTaps> {
        self.scheduler.kernel()
    }

    /// Grid presented by the last completed frame, black before the first.
    pub fn current(&self) -> Option<&Grid> {
        self.scheduler.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> Parameters {
        Parameters {
            outer_radius: 2.0,
            ..Parameters::default()
        }
    }

    #[test]
    fn scheduler_starts_uninitialized() {
        let mut scheduler = FrameScheduler::new(KernelPolicy::Track);
        assert_eq!(scheduler.state(), SchedulerState::Uninitialized);
        let err = scheduler
            .run_frame(Parameters::default(), PointerState::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotRunning(SchedulerState::Uninitialized)
        ));
    }

    #[test]
    fn tick_advances_counter_and_presents() {
        let mut pipeline = Pipeline::initialize(8, 6, &small_params()).unwrap();
        assert_eq!(pipeline.state(), SchedulerState::Running);
        let pointer = PointerState::centered(pipeline.extent());
        let presented = pipeline.tick(small_params(), pointer).unwrap().clone();
        assert_eq!(pipeline.frame(), 1);
        assert_eq!(pipeline.current(), Some(&presented));
        pipeline.tick(small_params(), pointer).unwrap();
        assert_eq!(pipeline.frame(), 2);
    }

    #[test]
    fn initialize_rejects_empty_extent() {
        let err = Pipeline::initialize(0, 4, &small_params()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Allocation(AllocationError::EmptyExtent { .. })
        ));
    }

    #[test]
    fn resize_to_same_extent_keeps_state() {
        let mut pipeline = Pipeline::initialize(8, 8, &small_params()).unwrap();
        pipeline.tick(small_params(), PointerState::default()).unwrap();
        pipeline.resize(8, 8).unwrap();
        assert_eq!(pipeline.frame(), 1);
    }

    #[test]
    fn failed_reset_is_fatal() {
        let mut pipeline = Pipeline::initialize(8, 8, &small_params()).unwrap();
        assert!(pipeline.resize(0, 8).is_err());
        assert_eq!(pipeline.state(), SchedulerState::Resetting);
        assert!(pipeline.current().is_none());
        let err = pipeline
            .tick(small_params(), PointerState::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotRunning(SchedulerState::Resetting)
        ));
        assert!(pipeline.resize(8, 8).is_err());
    }

    #[test]
    fn deferred_resizes_apply_last_request() {
        let mut pipeline = Pipeline::initialize(8, 8, &small_params()).unwrap();
        pipeline.tick(small_params(), PointerState::default()).unwrap();
        let handle = pipeline.resize_handle();
        let worker = std::thread::spawn(move || {
            assert!(handle.request(20, 10));
            assert!(handle.request(12, 7));
        });
        worker.join().unwrap();
        assert_eq!(pipeline.extent(), Extent::new(8, 8));
        let grid = pipeline
            .tick(small_params(), PointerState::default())
            .unwrap();
        assert_eq!(grid.extent(), Extent::new(12, 7));
        assert_eq!(pipeline.frame(), 1);
    }

    #[test]
    fn handle_reports_dropped_pipeline() {
        let pipeline = Pipeline::initialize(4, 4, &small_params()).unwrap();
        let handle = pipeline.resize_handle();
        pipeline.destroy();
        assert!(!handle.request(5, 5));
    }

    #[test]
    fn kernel_policy_controls_regeneration() {
        let wider = Parameters {
            outer_radius: 4.0,
            ..small_params()
        };

        let mut tracking = Pipeline::initialize(8, 8, &small_params()).unwrap();
        assert_eq!(tracking.kernel().unwrap().reach(), 2);
        tracking.tick(wider, PointerState::default()).unwrap();
        assert_eq!(tracking.kernel().unwrap().reach(), 4);

        let mut frozen =
            Pipeline::with_policy(8, 8, &small_params(), KernelPolicy::Frozen).unwrap();
        frozen.tick(wider, PointerState::default()).unwrap();
        assert_eq!(frozen.kernel().unwrap().reach(), 2);
    }
}
