// Fri Jan 17 2026 - Alex

use crate::memory::mach::{task_self, MachTask};
use crate::memory::{KernReturn, MemoryError};
use libc::{c_int, c_uint, pid_t};

extern "C" {
    fn task_for_pid(target_task: c_uint, pid: c_int, task: *mut c_uint) -> c_int;
    fn mach_port_deallocate(task: c_uint, name: c_uint) -> c_int;
}

/// Send right to another process's task port, released on drop.
pub struct TaskPort {
    pid: pid_t,
    port: c_uint,
}

impl TaskPort {
    pub fn for_pid(pid: pid_t) -> Result<Self, MemoryError> {
        let mut port: c_uint = 0;
        let kr = KernReturn(unsafe { task_for_pid(task_self(), pid, &mut port) });
        if !kr.is_success() {
            log::error!(
                "task_for_pid({}) failed with {}; root or the debugging entitlement is required",
                pid,
                kr
            );
            return Err(if kr.is_handle_error() {
                MemoryError::InvalidHandle(kr)
            } else {
                MemoryError::PermissionDenied(kr)
            });
        }
        log::debug!("Acquired task port {} for pid {}", port, pid);
        Ok(Self { pid, port })
    }

    pub fn pid(&self) -> pid_t {
        self.pid
    }

    pub fn task(&self) -> MachTask {
        MachTask::new(self.port)
    }
}

impl Drop for TaskPort {
    fn drop(&mut self) {
        let kr = KernReturn(unsafe { mach_port_deallocate(task_self(), self.port) });
        if !kr.is_success() {
            log::warn!("Failed to release task port {} for pid {}: {}", self.port, self.pid, kr);
        }
    }
}
