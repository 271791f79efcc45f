use log::*;
use vulkanalia::vk;

use super::device::DeviceInfo;

/// Outcome of ranking `one` against `two`.
///
/// `Fail` means the two could not be ranked at all. It is not a tie.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Equal,
    Less,
    Fail,
}

fn device_type_rating(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 2,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        _ => 0,
    }
}

fn vram_unattributed(info: &DeviceInfo) -> bool {
    if info
        .memory_heap
        .flags
        .contains(vk::MemoryHeapFlags::DEVICE_LOCAL)
    {
        return false;
    }
    error!("Failed to retrieve `{}` VRAM size.", info.device.display_name());
    true
}

/// Ranks two eligible devices.
///
/// The better device type earns two points, a larger device-local heap one,
/// and a larger maximum 2D image dimension one. A device whose VRAM heap
/// could not be found makes the whole comparison [`Comparison::Fail`].
pub fn compare(one: &DeviceInfo, two: &DeviceInfo) -> Comparison {
    let one_failed = vram_unattributed(one);
    let two_failed = vram_unattributed(two);
    if one_failed || two_failed {
        return Comparison::Fail;
    }

    let mut score_one = 0u32;
    let mut score_two = 0u32;

    let type_one = device_type_rating(one.properties.device_type);
    let type_two = device_type_rating(two.properties.device_type);
    if type_one > type_two {
        score_one += 2;
    } else if type_one < type_two {
        score_two += 2;
    }

    if one.memory_heap.size > two.memory_heap.size {
        score_one += 1;
    } else if one.memory_heap.size < two.memory_heap.size {
        score_two += 1;
    }

    let dimension_one = one.properties.limits.max_image_dimension_2d;
    let dimension_two = two.properties.limits.max_image_dimension_2d;
    if dimension_one > dimension_two {
        score_one += 1;
    } else if dimension_one < dimension_two {
        score_two += 1;
    }

    match score_one.cmp(&score_two) {
        std::cmp::Ordering::Greater => Comparison::Greater,
        std::cmp::Ordering::Less => Comparison::Less,
        std::cmp::Ordering::Equal => Comparison::Equal,
    }
}
