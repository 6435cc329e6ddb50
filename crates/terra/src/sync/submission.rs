//! Submission builder: translates a `{wait, signal, cmd}` description into
//! `VkSubmitInfo2`, per spec §4.5.

use ash::vk;

/// One wait operand: semaphore, the stage it gates, and (for timeline
/// semaphores) the value to wait for. Binary semaphores ignore `value`.
#[derive(Clone, Copy)]
pub struct WaitOp {
    pub semaphore: vk::Semaphore,
    pub stage: vk::PipelineStageFlags2,
    pub value: u64,
}

/// One signal operand.
#[derive(Clone, Copy)]
pub struct SignalOp {
    pub semaphore: vk::Semaphore,
    pub stage: vk::PipelineStageFlags2,
    pub value: u64,
}

/// A single submission: the waits, signals, and command buffers that make
/// up one `VkSubmitInfo2`.
#[derive(Default)]
pub struct SubmitDescription {
    pub waits: Vec<WaitOp>,
    pub signals: Vec<SignalOp>,
    pub command_buffers: Vec<vk::CommandBuffer>,
}

impl SubmitDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait(mut self, semaphore: vk::Semaphore, stage: vk::PipelineStageFlags2, value: u64) -> Self {
        self.waits.push(WaitOp { semaphore, stage, value });
        self
    }

    pub fn signal(mut self, semaphore: vk::Semaphore, stage: vk::PipelineStageFlags2, value: u64) -> Self {
        self.signals.push(SignalOp { semaphore, stage, value });
        self
    }

    pub fn command_buffer(mut self, cmd: vk::CommandBuffer) -> Self {
        self.command_buffers.push(cmd);
        self
    }

    /// Build the owned `VkSemaphoreSubmitInfo`/`VkCommandBufferSubmitInfo`
    /// arrays and the `VkSubmitInfo2` referencing them. Returned as a tuple
    /// so the caller controls the arrays' lifetime across the `queue_submit2`
    /// call.
    pub fn build(&self) -> BuiltSubmit<'_> {
        let wait_infos: Vec<vk::SemaphoreSubmitInfo> = self
            .waits
            .iter()
            .map(|w| {
                vk::SemaphoreSubmitInfo::builder()
                    .semaphore(w.semaphore)
                    .value(w.value)
                    .stage_mask(w.stage)
                    .build()
            })
            .collect();
        let signal_infos: Vec<vk::SemaphoreSubmitInfo> = self
            .signals
            .iter()
            .map(|s| {
                vk::SemaphoreSubmitInfo::builder()
                    .semaphore(s.semaphore)
                    .value(s.value)
                    .stage_mask(s.stage)
                    .build()
            })
            .collect();
        let cmd_infos: Vec<vk::CommandBufferSubmitInfo> = self
            .command_buffers
            .iter()
            .map(|&cb| vk::CommandBufferSubmitInfo::builder().command_buffer(cb).build())
            .collect();

        BuiltSubmit {
            wait_infos,
            signal_infos,
            cmd_infos,
            _marker: std::marker::PhantomData,
        }
    }
}

/// Owns the per-submission arrays `VkSubmitInfo2` points into.
pub struct BuiltSubmit<'a> {
    wait_infos: Vec<vk::SemaphoreSubmitInfo<'a>>,
    signal_infos: Vec<vk::SemaphoreSubmitInfo<'a>>,
    cmd_infos: Vec<vk::CommandBufferSubmitInfo<'a>>,
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a> BuiltSubmit<'a> {
    pub fn submit_info(&self) -> vk::SubmitInfo2 {
        vk::SubmitInfo2::builder()
            .wait_semaphore_infos(&self.wait_infos)
            .signal_semaphore_infos(&self.signal_infos)
            .command_buffer_infos(&self.cmd_infos)
            .build()
    }
}
