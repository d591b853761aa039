//! Physical device (GPU) selection.
//!
//! A device is suitable when it has:
//! 1. a graphics queue family and a family that can present to the surface
//! 2. the `VK_KHR_swapchain` extension
//! 3. at least one surface format and one present mode for the surface
//!
//! Suitable devices are ranked by type, discrete first.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::context::QueueFamilyPair;
use crate::error::RhiError;
use crate::swapchain::SwapchainSupportDetails;

/// Device extensions every candidate must support.
pub const DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue family indices for the roles this renderer uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Both graphics and present families were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// The resolved pair, if complete.
    pub fn pair(&self) -> Option<QueueFamilyPair> {
        Some(QueueFamilyPair {
            graphics: self.graphics_family?,
            present: self.present_family?,
        })
    }

    /// Unique family indices, for one `VkDeviceQueueCreateInfo` each.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }
}

/// A physical device that passed the suitability checks.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub queue_families: QueueFamilyPair,
}

impl PhysicalDeviceInfo {
    pub fn device_name(&self) -> &str {
        self.properties
            .device_name_as_c_str()
            .ok()
            .and_then(|name| name.to_str().ok())
            .unwrap_or("Unknown Device")
    }

    pub fn device_type_name(&self) -> &'static str {
        device_type_name(self.properties.device_type)
    }

    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{major}.{minor}.{patch}"))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

fn device_type_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        _ => "Other",
    }
}

/// Selects the most suitable physical device for presenting to `surface`.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no device passes the checks.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let selected = devices
        .into_iter()
        .filter_map(|device| check_device_suitability(instance, device, surface, surface_loader))
        .map(|info| {
            let score = rate_device_type(info.properties.device_type);
            debug!(
                "GPU '{}' ({}) - Score: {}",
                info.device_name(),
                info.device_type_name(),
                score
            );
            (info, score)
        })
        .max_by_key(|(_, score)| *score);

    let Some((selected, score)) = selected else {
        warn!("No suitable GPU found with required capabilities");
        return Err(RhiError::NoSuitableGpu);
    };

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected GPU: '{}' ({}) - Vulkan {}.{}.{}, Score: {}",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch,
        score
    );

    Ok(selected)
}

fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let device_name = properties
        .device_name_as_c_str()
        .ok()
        .and_then(|name| name.to_str().ok())
        .unwrap_or("Unknown")
        .to_owned();

    let indices = find_queue_families(instance, device, surface, surface_loader);
    let Some(queue_families) = indices.pair() else {
        debug!(
            "GPU '{}' skipped: missing required queue families (graphics={}, present={})",
            device_name,
            indices.graphics_family.is_some(),
            indices.present_family.is_some()
        );
        return None;
    };

    let available = unsafe {
        instance
            .enumerate_device_extension_properties(device)
            .unwrap_or_default()
    };
    if let Some(missing) = missing_extension(&available) {
        debug!("GPU '{}' skipped: missing extension {:?}", device_name, missing);
        return None;
    }

    match SwapchainSupportDetails::query(device, surface, surface_loader) {
        Ok(support) if support.is_adequate() => {}
        Ok(_) => {
            debug!("GPU '{}' skipped: no surface formats or present modes", device_name);
            return None;
        }
        Err(e) => {
            debug!("GPU '{}' skipped: surface query failed: {}", device_name, e);
            return None;
        }
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        queue_families,
    })
}

fn missing_extension(available: &[vk::ExtensionProperties]) -> Option<&'static CStr> {
    DEVICE_EXTENSIONS.iter().copied().find(|required| {
        !available
            .iter()
            .any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == *required))
    })
}

/// Finds graphics and present families, preferring one family that does both.
fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let capabilities: Vec<(bool, bool)> = families
        .iter()
        .enumerate()
        .map(|(i, family)| {
            if family.queue_count == 0 {
                return (false, false);
            }
            let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let present = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, i as u32, surface)
                    .unwrap_or(false)
            };
            (graphics, present)
        })
        .collect();

    choose_queue_families(&capabilities)
}

/// `capabilities[i]` is `(supports_graphics, supports_present)` for family `i`.
fn choose_queue_families(capabilities: &[(bool, bool)]) -> QueueFamilyIndices {
    if let Some(both) = capabilities.iter().position(|&(g, p)| g && p) {
        let index = both as u32;
        return QueueFamilyIndices {
            graphics_family: Some(index),
            present_family: Some(index),
        };
    }

    QueueFamilyIndices {
        graphics_family: capabilities.iter().position(|&(g, _)| g).map(|i| i as u32),
        present_family: capabilities.iter().position(|&(_, p)| p).map(|i| i as u32),
    }
}

fn rate_device_type(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 10000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 100,
        vk::PhysicalDeviceType::CPU => 10,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_family_indices_default() {
        let indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete());
        assert!(indices.pair().is_none());
    }

    #[test]
    fn test_queue_family_indices_incomplete() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: None,
        };
        assert!(!indices.is_complete());

        let indices = QueueFamilyIndices {
            graphics_family: None,
            present_family: Some(0),
        };
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_unique_families() {
        let split = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(1),
        };
        assert_eq!(split.unique_families(), vec![0, 1]);

        let shared = QueueFamilyIndices {
            graphics_family: Some(2),
            present_family: Some(2),
        };
        assert_eq!(shared.unique_families(), vec![2]);
        assert!(shared.pair().unwrap().is_shared());
    }

    #[test]
    fn test_choose_queue_families_prefers_shared_family() {
        // Family 0 graphics only, family 1 present only, family 2 both.
        let indices = choose_queue_families(&[(true, false), (false, true), (true, true)]);
        assert_eq!(indices.graphics_family, Some(2));
        assert_eq!(indices.present_family, Some(2));
    }

    #[test]
    fn test_choose_queue_families_split() {
        let indices = choose_queue_families(&[(false, false), (true, false), (false, true)]);
        assert_eq!(indices.graphics_family, Some(1));
        assert_eq!(indices.present_family, Some(2));

        let indices = choose_queue_families(&[(false, true)]);
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_rate_device_type_order() {
        let discrete = rate_device_type(vk::PhysicalDeviceType::DISCRETE_GPU);
        let integrated = rate_device_type(vk::PhysicalDeviceType::INTEGRATED_GPU);
        let virt = rate_device_type(vk::PhysicalDeviceType::VIRTUAL_GPU);
        let cpu = rate_device_type(vk::PhysicalDeviceType::CPU);
        assert!(discrete > integrated && integrated > virt && virt > cpu);
    }

    #[test]
    fn test_missing_extension() {
        assert_eq!(missing_extension(&[]), Some(ash::khr::swapchain::NAME));

        let mut swapchain = vk::ExtensionProperties::default();
        for (dst, src) in swapchain
            .extension_name
            .iter_mut()
            .zip(ash::khr::swapchain::NAME.to_bytes_with_nul())
        {
            *dst = *src as std::ffi::c_char;
        }
        assert_eq!(missing_extension(&[swapchain]), None);
    }
}
