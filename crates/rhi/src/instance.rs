//! Vulkan instance management.
//!
//! The [`Instance`] owns the loader entry, the `VkInstance` and, when
//! validation is enabled and available, a debug messenger that forwards
//! validation output into `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use swapframe_rhi::instance::Instance;
//!
//! // Surface extensions normally come from the platform layer.
//! let instance = Instance::new(c"swapframe", &[], cfg!(debug_assertions))
//!     .expect("Failed to create Vulkan instance");
//! let vk_instance = instance.handle();
//! ```

use std::ffi::{CStr, c_char};

use ash::{Entry, vk};
use tracing::{debug, error, info, warn};

use crate::error::RhiError;

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with optional validation layer support.
pub struct Instance {
    entry: Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Arguments
    ///
    /// * `application_name` - Reported to the driver
    /// * `surface_extensions` - Instance extensions the window system needs,
    ///   as returned by `ash_window::enumerate_required_extensions`
    /// * `enable_validation` - Request the Khronos validation layer and a debug messenger
    ///
    /// # Errors
    ///
    /// Returns an error if the Vulkan library cannot be loaded or instance
    /// creation fails. A missing validation layer is logged, not an error.
    pub fn new(
        application_name: &CStr,
        surface_extensions: &[*const c_char],
        enable_validation: bool,
    ) -> Result<Self, RhiError> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            enable_validation && Self::is_validation_layer_available(&entry)?;
        if enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(application_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"swapframe")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extensions = surface_extensions.to_vec();
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!(
            "Vulkan instance created ({} extension(s), validation: {})",
            extensions.len(),
            validation_available
        );

        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => {
                    debug!("Debug messenger created");
                    (Some(debug_utils), Some(messenger))
                }
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are enabled.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    fn is_validation_layer_available(entry: &Entry) -> Result<bool, RhiError> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        Ok(available_layers.iter().any(|layer| {
            layer
                .layer_name_as_c_str()
                .is_ok_and(|name| name == VALIDATION_LAYER_NAME)
        }))
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        Ok(unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Forwards validation layer messages to `tracing`.
///
/// # Safety
///
/// Called by the Vulkan loader; `p_callback_data` is either null or valid for
/// the duration of the call.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let kind = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => error!("[Vulkan {kind}] {message}"),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => warn!("[Vulkan {kind}] {message}"),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => info!("[Vulkan {kind}] {message}"),
        _ => debug!("[Vulkan {kind}] {message}"),
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_instance_creation() {
        // Requires a Vulkan loader; skipped otherwise.
        match Instance::new(c"swapframe-test", &[], false) {
            Ok(instance) => {
                assert!(!instance.has_validation());
                assert!(instance.debug_utils.is_none());
            }
            Err(RhiError::LoadingError(_)) => {
                eprintln!("Skipping test: Vulkan not available");
            }
            Err(RhiError::VulkanError(e)) => {
                eprintln!("Skipping test: no usable Vulkan driver ({e})");
            }
            Err(e) => panic!("Unexpected error: {e:?}"),
        }
    }
}
