// Fri Jan 17 2026 - Alex

use crate::memory::{KernReturn, RawRegion, Transfer, VmPrimitives};
use libc::{c_int, c_uint, uintptr_t};

#[allow(non_camel_case_types)]
type mach_port_t = c_uint;
#[allow(non_camel_case_types)]
type kern_return_t = c_int;
#[allow(non_camel_case_types)]
type mach_vm_address_t = u64;
#[allow(non_camel_case_types)]
type mach_vm_size_t = u64;
#[allow(non_camel_case_types)]
type mach_msg_type_number_t = c_uint;

const VM_REGION_BASIC_INFO_64: c_int = 9;
const VM_REGION_BASIC_INFO_COUNT_64: mach_msg_type_number_t = 9;

#[repr(C, packed(4))]
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, Default)]
struct VmRegionBasicInfo64 {
    protection: c_int,
    max_protection: c_int,
    inheritance: c_uint,
    shared: c_uint,
    reserved: c_uint,
    offset: u64,
    behavior: c_int,
    user_wired_count: u16,
}

extern "C" {
    static mach_task_self_: mach_port_t;

    fn mach_vm_region(
        target_task: mach_port_t,
        address: *mut mach_vm_address_t,
        size: *mut mach_vm_size_t,
        flavor: c_int,
        info: *mut c_int,
        info_count: *mut mach_msg_type_number_t,
        object_name: *mut mach_port_t,
    ) -> kern_return_t;

    fn mach_vm_read(
        target_task: mach_port_t,
        address: mach_vm_address_t,
        size: mach_vm_size_t,
        data: *mut uintptr_t,
        data_count: *mut mach_msg_type_number_t,
    ) -> kern_return_t;

    fn mach_vm_deallocate(target: mach_port_t, address: mach_vm_address_t, size: mach_vm_size_t) -> kern_return_t;
}

pub(crate) fn task_self() -> mach_port_t {
    // SAFETY: initialized by libSystem before `main` and never written again.
    unsafe { mach_task_self_ }
}

/// Borrowed view of a task port. The port is owned elsewhere and outlives
/// every scan that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachTask {
    port: mach_port_t,
}

impl MachTask {
    pub fn new(port: u32) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u32 {
        self.port
    }
}

// SAFETY: `mach_vm_read` maps `data_count` bytes into our own task, which
// stay valid until `mach_vm_deallocate` is called on `mach_task_self`.
unsafe impl VmPrimitives for MachTask {
    fn region(&self, address: u64) -> Result<RawRegion, KernReturn> {
        let mut address: mach_vm_address_t = address;
        let mut size: mach_vm_size_t = 0;
        let mut info = VmRegionBasicInfo64::default();
        let mut info_count = VM_REGION_BASIC_INFO_COUNT_64;
        let mut object_name: mach_port_t = 0;

        let kr = unsafe {
            mach_vm_region(
                self.port,
                &mut address,
                &mut size,
                VM_REGION_BASIC_INFO_64,
                &mut info as *mut _ as *mut c_int,
                &mut info_count,
                &mut object_name,
            )
        };
        KernReturn(kr).into_result()?;

        Ok(RawRegion {
            address,
            size,
            protection: info.protection as u32,
            max_protection: info.max_protection as u32,
            shared: info.shared != 0,
            reserved: info.reserved != 0,
            offset: info.offset,
            user_wired_count: info.user_wired_count,
        })
    }

    fn read(&self, address: u64, size: u64) -> Result<Transfer, KernReturn> {
        // The transfer count comes back as 32 bits.
        if size > mach_msg_type_number_t::MAX as u64 {
            return Err(KernReturn::INVALID_ARGUMENT);
        }
        let mut data: uintptr_t = 0;
        let mut data_count: mach_msg_type_number_t = 0;

        let kr = unsafe { mach_vm_read(self.port, address, size, &mut data, &mut data_count) };
        KernReturn(kr).into_result()?;

        Ok(Transfer {
            address: data as u64,
            size: data_count as u64,
        })
    }

    fn deallocate(&self, transfer: Transfer) -> Result<(), KernReturn> {
        let kr = unsafe { mach_vm_deallocate(task_self(), transfer.address, transfer.size) };
        KernReturn(kr).into_result()
    }
}
