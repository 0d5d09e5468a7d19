//! OpenFFBoard USB identifiers and serial link defaults.
//!
//! Sources:
//! - <https://pid.codes/1209/FFB0/> (official pid.codes entry)
//! - <https://github.com/Ultrawipf/OpenFFBoard>

/// OpenFFBoard USB Vendor ID (pid.codes open hardware VID).
pub const OPENFFBOARD_VENDOR_ID: u16 = 0x1209;

/// OpenFFBoard main product ID.
///
/// The HID command channel is exposed on this product.
pub const OPENFFBOARD_PRODUCT_ID: u16 = 0xFFB0;

/// OpenFFBoard alternate product ID (secondary firmware builds).
pub const OPENFFBOARD_PRODUCT_ID_ALT: u16 = 0xFFB1;

/// Baud rate used by the board's CDC serial command interface.
///
/// The CDC link ignores the value on the wire, but host serial stacks
/// still require one when opening the port.
pub const DEFAULT_SERIAL_BAUD_RATE: u32 = 500_000;

/// Returns `true` if `product_id` is a known OpenFFBoard product.
///
/// # Examples
/// ```
/// use racing_wheel_hid_openffboard_protocol::ids::is_openffboard_product;
/// assert!(is_openffboard_product(0xFFB0));
/// assert!(is_openffboard_product(0xFFB1));
/// assert!(!is_openffboard_product(0x0001));
/// ```
pub fn is_openffboard_product(product_id: u16) -> bool {
    matches!(product_id, OPENFFBOARD_PRODUCT_ID | OPENFFBOARD_PRODUCT_ID_ALT)
}

/// Returns `true` if a USB device with this vendor/product pair carries the
/// OpenFFBoard HID command channel.
pub fn is_openffboard_device(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == OPENFFBOARD_VENDOR_ID && is_openffboard_product(product_id)
}
