//! Command buffer management.

use crate::error::Result;
use ash::vk;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(
        device: &ash::Device,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = unsafe { device.create_command_pool(&create_info, None)? };

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate primary command buffers.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffers(
        &self,
        device: &ash::Device,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe { device.allocate_command_buffers(&alloc_info)? };
        Ok(buffers)
    }

    /// Destroy the command pool.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_command_pool(self.pool, None) };
    }
}

/// Reset and begin recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid, and the buffer must come
/// from a pool created with `RESET_COMMAND_BUFFER`.
pub unsafe fn begin_command_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
    unsafe {
        device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
        device.begin_command_buffer(cmd, &begin_info)?;
    }
    Ok(())
}

/// End recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn end_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    unsafe { device.end_command_buffer(cmd)? };
    Ok(())
}

/// Submit one command buffer with a single wait and a single signal semaphore.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffer(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    wait: (vk::Semaphore, vk::PipelineStageFlags2),
    signal: vk::Semaphore,
    fence: vk::Fence,
) -> Result<()> {
    let wait_infos = [vk::SemaphoreSubmitInfo::default()
        .semaphore(wait.0)
        .stage_mask(wait.1)];
    let signal_infos = [vk::SemaphoreSubmitInfo::default()
        .semaphore(signal)
        .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
    let cmd_infos = [vk::CommandBufferSubmitInfo::default().command_buffer(cmd)];

    let submit_info = vk::SubmitInfo2::default()
        .wait_semaphore_infos(&wait_infos)
        .command_buffer_infos(&cmd_infos)
        .signal_semaphore_infos(&signal_infos);

    unsafe { device.queue_submit2(queue, &[submit_info], fence)? };
    Ok(())
}

/// Execute a single-time command buffer and wait for it.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn execute_single_time_commands<F>(
    device: &ash::Device,
    pool: &CommandPool,
    queue: vk::Queue,
    f: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let cmds = unsafe { pool.allocate_command_buffers(device, 1)? };
    let result = unsafe { record_and_wait(device, queue, cmds[0], f) };
    unsafe { device.free_command_buffers(pool.handle(), &cmds) };
    result
}

unsafe fn record_and_wait<F>(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    f: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    unsafe { device.begin_command_buffer(cmd, &begin_info)? };
    f(cmd);
    unsafe { end_command_buffer(device, cmd)? };

    let cmds = [cmd];
    let submit_info = vk::SubmitInfo::default().command_buffers(&cmds);
    unsafe {
        device.queue_submit(queue, &[submit_info], vk::Fence::null())?;
        device.queue_wait_idle(queue)?;
    }
    Ok(())
}
