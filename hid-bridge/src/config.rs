//! Bridge configuration and device identity
//!
//! Runtime knobs for the bridge plus the identifiers both sides of the link
//! are registered with: the GATT service the inbound frames are written to,
//! and the USB device that emits them.

#[cfg(feature = "usb")]
use crate::frame::FRAME_SIZE;

/// 128-bit UUID of the UART-style GATT service carrying inbound frames
pub const UART_SERVICE_UUID: u128 = 0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E;

/// 128-bit UUID of the writable RX characteristic, one 8-byte frame per write
pub const UART_RX_CHAR_UUID: u128 = 0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E;

/// USB HID report descriptor for a boot keyboard with 8-byte reports
pub const KEYBOARD_REPORT_DESC: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array)
    0xC0,       // End Collection
];

/// Runtime behavior of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Request a remote wake instead of queueing when the bus is suspended
    ///
    /// When disabled, writes are queued regardless of the bus state.
    pub remote_wakeup: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { remote_wakeup: true }
    }
}

/// USB device identity
///
/// # Example
///
/// ```no_run
/// use hid_bridge::UsbIdentity;
///
/// let identity = UsbIdentity {
///     product: "My Bridge",
///     ..Default::default()
/// };
/// assert!(identity.validate());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbIdentity {
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: &'static str,

    /// Maximum bus current in mA, at most 500
    pub max_power_ma: u16,

    /// Interrupt endpoint polling interval in ms (1-255)
    pub poll_ms: u8,
}

impl Default for UsbIdentity {
    fn default() -> Self {
        Self {
            // pid.codes test VID/PID
            vid: 0x1209,
            pid: 0x0001,
            manufacturer: "hid-bridge",
            product: "BLE to USB HID Bridge",
            serial_number: "00000001",
            max_power_ma: 100,
            poll_ms: 1,
        }
    }
}

impl UsbIdentity {
    /// Check that all parameters are within valid ranges
    pub fn validate(&self) -> bool {
        self.vid != 0 && self.pid != 0 && self.max_power_ma <= 500 && self.poll_ms >= 1
    }

    /// Build the embassy-usb device configuration
    #[cfg(feature = "usb")]
    pub fn usb_config(&self, bridge: &BridgeConfig) -> embassy_usb::Config<'static> {
        let mut config = embassy_usb::Config::new(self.vid, self.pid);
        config.manufacturer = Some(self.manufacturer);
        config.product = Some(self.product);
        config.serial_number = Some(self.serial_number);
        config.max_power = self.max_power_ma;
        config.supports_remote_wakeup = bridge.remote_wakeup;
        config
    }

    /// Build the HID class configuration for the keyboard interface
    #[cfg(feature = "usb")]
    pub fn hid_config(&self) -> embassy_usb::class::hid::Config<'static> {
        embassy_usb::class::hid::Config {
            report_descriptor: KEYBOARD_REPORT_DESC,
            request_handler: None,
            poll_ms: self.poll_ms,
            max_packet_size: FRAME_SIZE as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity_valid() {
        let identity = UsbIdentity::default();
        assert!(identity.validate());
        assert_eq!(identity.vid, 0x1209);
    }

    #[test]
    fn test_invalid_identity() {
        let mut identity = UsbIdentity::default();
        identity.max_power_ma = 501;
        assert!(!identity.validate());

        let mut identity = UsbIdentity::default();
        identity.poll_ms = 0;
        assert!(!identity.validate());

        let mut identity = UsbIdentity::default();
        identity.pid = 0;
        assert!(!identity.validate());
    }

    #[test]
    fn test_default_bridge_config() {
        assert!(BridgeConfig::default().remote_wakeup);
    }

    #[test]
    fn test_report_descriptor_shape() {
        // Usage Page (Generic Desktop), Usage (Keyboard)
        assert_eq!(&KEYBOARD_REPORT_DESC[..4], &[0x05, 0x01, 0x09, 0x06]);
        assert_eq!(KEYBOARD_REPORT_DESC[KEYBOARD_REPORT_DESC.len() - 1], 0xC0);
    }

    #[test]
    fn test_uart_uuids_share_base() {
        let base_mask = !(0xFFFF_FFFFu128 << 96);
        assert_eq!(UART_SERVICE_UUID & base_mask, UART_RX_CHAR_UUID & base_mask);
        assert_eq!(UART_RX_CHAR_UUID >> 96, 0x6E400002);
    }

    #[cfg(feature = "usb")]
    #[test]
    fn test_usb_config() {
        let identity = UsbIdentity::default();
        let config = identity.usb_config(&BridgeConfig { remote_wakeup: false });
        assert_eq!(config.manufacturer, Some("hid-bridge"));
        assert_eq!(config.serial_number, Some("00000001"));
        assert_eq!(config.max_power, 100);
        assert!(!config.supports_remote_wakeup);

        let config = identity.usb_config(&BridgeConfig::default());
        assert!(config.supports_remote_wakeup);
    }

    #[cfg(feature = "usb")]
    #[test]
    fn test_hid_config() {
        let identity = UsbIdentity {
            poll_ms: 10,
            ..Default::default()
        };
        let config = identity.hid_config();
        assert_eq!(config.report_descriptor, KEYBOARD_REPORT_DESC);
        assert_eq!(config.poll_ms, 10);
        assert_eq!(config.max_packet_size, 8);
        assert!(config.request_handler.is_none());
    }
}
