//! Host-visible GPU buffers: allocation, upload and teardown.

use std::ffi::c_void;

use ash::vk;
use tracing::{debug, warn};

use rplug_core::{AllocationStage, PluginError};

use crate::device::DeviceApi;

/// A buffer bound to its own host-visible allocation, persistently mapped.
///
/// Owned by whoever allocated it and released only through [`destroy_buffer`].
/// A non-null `mapped` pointer always belongs to a live `memory`.
#[derive(Debug)]
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub mapped: *mut c_void,
    /// Size requested by the caller.
    pub size: vk::DeviceSize,
    /// Size of the backing allocation, at least `size`.
    pub allocated_size: vk::DeviceSize,
    /// Properties of the memory type actually chosen.
    pub memory_flags: vk::MemoryPropertyFlags,
}

// SAFETY: the mapping is exclusively owned by this buffer and only touched
// from the host's render thread.
unsafe impl Send for GpuBuffer {}

impl Default for GpuBuffer {
    fn default() -> Self {
        Self {
            buffer: vk::Buffer::null(),
            memory: vk::DeviceMemory::null(),
            mapped: std::ptr::null_mut(),
            size: 0,
            allocated_size: 0,
            memory_flags: vk::MemoryPropertyFlags::empty(),
        }
    }
}

impl GpuBuffer {
    /// True when no native object is held.
    pub fn is_empty(&self) -> bool {
        self.buffer == vk::Buffer::null()
            && self.memory == vk::DeviceMemory::null()
            && self.mapped.is_null()
    }

    /// Host writes must be flushed before the device can see them.
    pub fn needs_flush(&self) -> bool {
        !self
            .memory_flags
            .contains(vk::MemoryPropertyFlags::HOST_COHERENT)
    }
}

/// First memory type allowed by `type_bits` whose flags include all of `required`.
pub fn find_memory_type_index(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = (properties.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES);
    properties.memory_types[..count]
        .iter()
        .enumerate()
        .find(|&(i, ty)| type_bits & (1 << i) != 0 && ty.property_flags.contains(required))
        .map(|(i, _)| i as u32)
}

/// Destroys whatever part of a buffer was built if allocation bails out early.
struct PartialBuffer<'a, D: DeviceApi + ?Sized> {
    device: &'a D,
    buffer: GpuBuffer,
}

impl<D: DeviceApi + ?Sized> PartialBuffer<'_, D> {
    fn finish(mut self) -> GpuBuffer {
        std::mem::take(&mut self.buffer)
    }
}

impl<D: DeviceApi + ?Sized> Drop for PartialBuffer<'_, D> {
    fn drop(&mut self) {
        destroy_buffer(self.device, &mut self.buffer);
    }
}

fn failed(stage: AllocationStage, result: vk::Result) -> PluginError {
    warn!("{} failed: {:?}", stage, result);
    PluginError::AllocationFailure {
        stage,
        code: result.as_raw(),
    }
}

/// Create a host-visible, mapped buffer of `size` bytes for one queue family.
///
/// Nothing native is touched for a zero size. On any failure the partially
/// built buffer is released before returning.
pub fn allocate_buffer<D: DeviceApi + ?Sized>(
    device: &D,
    queue_family_index: u32,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
) -> Result<GpuBuffer, PluginError> {
    if size == 0 {
        return Err(PluginError::ZeroSizedBuffer);
    }

    let queue_families = [queue_family_index];
    let create_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .queue_family_indices(&queue_families);

    let mut partial = PartialBuffer {
        device,
        buffer: GpuBuffer::default(),
    };

    let buffer = device
        .create_buffer(&create_info)
        .map_err(|e| failed(AllocationStage::CreateBuffer, e))?;
    partial.buffer.buffer = buffer;

    let properties = device.memory_properties();
    let requirements = device.buffer_memory_requirements(buffer);

    let type_index = find_memory_type_index(
        &properties,
        requirements.memory_type_bits,
        vk::MemoryPropertyFlags::HOST_VISIBLE,
    )
    .ok_or_else(|| {
        warn!(
            "no host-visible memory type in mask {:#x}",
            requirements.memory_type_bits
        );
        PluginError::NoHostVisibleMemory {
            type_bits: requirements.memory_type_bits,
        }
    })?;

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(type_index);
    let memory = device
        .allocate_memory(&alloc_info)
        .map_err(|e| failed(AllocationStage::AllocateMemory, e))?;
    partial.buffer.memory = memory;

    partial.buffer.mapped = device
        .map_memory(memory)
        .map_err(|e| failed(AllocationStage::MapMemory, e))?;

    device
        .bind_buffer_memory(buffer, memory)
        .map_err(|e| failed(AllocationStage::BindMemory, e))?;

    partial.buffer.size = size;
    partial.buffer.allocated_size = requirements.size;
    partial.buffer.memory_flags = properties.memory_types[type_index as usize].property_flags;

    debug!(
        "allocated {} byte buffer ({} bytes, type {}, {:?})",
        size, requirements.size, type_index, partial.buffer.memory_flags
    );
    Ok(partial.finish())
}

/// Release a buffer: handle first, then the mapping, then the memory.
///
/// Safe on partially built and already destroyed buffers; leaves `buffer`
/// empty so repeated calls issue no native work.
pub fn destroy_buffer<D: DeviceApi + ?Sized>(device: &D, buffer: &mut GpuBuffer) {
    let GpuBuffer {
        buffer: handle,
        memory,
        mapped,
        ..
    } = std::mem::take(buffer);

    if handle != vk::Buffer::null() {
        device.destroy_buffer(handle);
    }
    if !mapped.is_null() && memory != vk::DeviceMemory::null() {
        device.unmap_memory(memory);
    }
    if memory != vk::DeviceMemory::null() {
        device.free_memory(memory);
    }
}

/// Copy `data` into the start of the mapping and make it visible to the device.
///
/// Non-coherent memory is flushed over the whole allocation.
pub fn upload<D: DeviceApi + ?Sized>(
    device: &D,
    buffer: &GpuBuffer,
    data: &[u8],
) -> Result<(), PluginError> {
    if buffer.mapped.is_null() {
        return Err(failed(
            AllocationStage::MapMemory,
            vk::Result::ERROR_MEMORY_MAP_FAILED,
        ));
    }

    let len = data.len().min(buffer.size as usize);
    if len < data.len() {
        warn!("upload of {} bytes truncated to {}", data.len(), len);
    }
    // SAFETY: `mapped` covers at least `size` bytes of live memory.
    unsafe {
        std::ptr::copy_nonoverlapping(data.as_ptr(), buffer.mapped as *mut u8, len);
    }

    if buffer.needs_flush() {
        let range = vk::MappedMemoryRange::default()
            .memory(buffer.memory)
            .offset(0)
            .size(buffer.allocated_size);
        device
            .flush_mapped_memory_ranges(std::slice::from_ref(&range))
            .map_err(|e| failed(AllocationStage::FlushMemory, e))?;
    }
    Ok(())
}
