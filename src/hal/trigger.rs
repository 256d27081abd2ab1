//! Trigger button interrupt.
//!
//! A press latches one request in [`ShotRequests`]; the transmit task takes
//! it from there.

use core::ffi::c_void;
use core::sync::atomic::{AtomicU32, Ordering};

use esp_idf_svc::sys::{
    esp, gpio_config, gpio_config_t, gpio_install_isr_service, gpio_int_type_t_GPIO_INTR_NEGEDGE,
    gpio_int_type_t_GPIO_INTR_POSEDGE, gpio_isr_handler_add, gpio_isr_handler_remove,
    gpio_mode_t_GPIO_MODE_INPUT, gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
    gpio_pulldown_t_GPIO_PULLDOWN_ENABLE, gpio_pullup_t_GPIO_PULLUP_DISABLE,
    gpio_pullup_t_GPIO_PULLUP_ENABLE, EspError, ESP_ERR_INVALID_STATE,
};

use crate::config::TriggerConfig;
use crate::trigger::ShotRequests;

/// Presses closer together than this are contact bounce.
pub const DEBOUNCE_US: u32 = 50_000;

/// Time of the last accepted press (µs, wrapping).
static LAST_PRESS_US: AtomicU32 = AtomicU32::new(0);

/// Installed trigger interrupt.
pub struct TriggerInput {
    pin: i32,
}

impl TriggerInput {
    /// Configure the trigger pin and route presses into `requests`.
    pub fn new(config: &TriggerConfig, requests: &'static ShotRequests) -> Result<Self, EspError> {
        let (pull_up, pull_down, edge) = if config.active_low {
            (
                gpio_pullup_t_GPIO_PULLUP_ENABLE,
                gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                gpio_int_type_t_GPIO_INTR_NEGEDGE,
            )
        } else {
            (
                gpio_pullup_t_GPIO_PULLUP_DISABLE,
                gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
                gpio_int_type_t_GPIO_INTR_POSEDGE,
            )
        };

        let io_config = gpio_config_t {
            pin_bit_mask: 1u64 << config.pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: pull_up,
            pull_down_en: pull_down,
            intr_type: edge,
            ..Default::default()
        };

        // SAFETY: plain driver calls; requests is 'static so the ISR
        // argument never dangles
        unsafe {
            esp!(gpio_config(&io_config))?;

            // Already installed by another driver is fine
            let installed = gpio_install_isr_service(0);
            if installed != ESP_ERR_INVALID_STATE as i32 {
                esp!(installed)?;
            }

            esp!(gpio_isr_handler_add(
                config.pin,
                Some(on_trigger),
                requests as *const ShotRequests as *mut c_void,
            ))?;
        }

        Ok(Self { pin: config.pin })
    }
}

impl Drop for TriggerInput {
    fn drop(&mut self) {
        // SAFETY: handler added in new()
        unsafe {
            gpio_isr_handler_remove(self.pin);
        }
    }
}

unsafe extern "C" fn on_trigger(arg: *mut c_void) {
    let now = crate::clock::now_us() as u32;
    let last = LAST_PRESS_US.load(Ordering::Relaxed);
    if now.wrapping_sub(last) < DEBOUNCE_US {
        return;
    }
    LAST_PRESS_US.store(now, Ordering::Relaxed);

    // SAFETY: arg was registered as &'static ShotRequests
    let requests = &*(arg as *const ShotRequests);
    requests.request();
}
