//! Builds the kernel `uinput` virtual device the driver reports touches
//! through.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisCode, AttributeSet, KeyCode, UinputAbsSetup,
};

use crate::config::{Config, MAX_TOUCH};
use crate::error::DriverError;

const DEVICE_NAME: &str = "HPTouchpad";

/// Create and register the multi-touch virtual device for `config`'s
/// orientation, with absolute axis ranges matching that orientation's
/// output resolution.
pub fn create(config: &Config) -> Result<VirtualDevice, DriverError> {
    let (x_max, y_max) = config.orientation.resolution();

    // Fuzz matches the original driver's device.absfuzz settings (2 on X,
    // 1 on Y) rather than 0 on both axes.
    let touch_x = UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_POSITION_X, AbsInfo::new(0, 0, x_max, 2, 0, 0));
    let touch_y = UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_POSITION_Y, AbsInfo::new(0, 0, y_max, 1, 0, 0));
    let slot = UinputAbsSetup::new(
        AbsoluteAxisCode::ABS_MT_SLOT,
        AbsInfo::new(0, 0, (MAX_TOUCH - 1) as i32, 0, 0, 0),
    );
    let tracking_id =
        UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_TRACKING_ID, AbsInfo::new(-1, -1, i32::MAX, 0, 0, 0));
    let touch_major =
        UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_TOUCH_MAJOR, AbsInfo::new(0, 0, x_max.max(y_max), 0, 0, 0));

    let mut keys = AttributeSet::<KeyCode>::new();
    keys.insert(KeyCode::BTN_TOUCH);

    let device = VirtualDeviceBuilder::new()
        .map_err(DriverError::InputSinkCreate)?
        .name(DEVICE_NAME)
        .with_keys(&keys)
        .map_err(DriverError::InputSinkCreate)?
        .with_absolute_axis(&slot)
        .map_err(DriverError::InputSinkCreate)?
        .with_absolute_axis(&tracking_id)
        .map_err(DriverError::InputSinkCreate)?
        .with_absolute_axis(&touch_major)
        .map_err(DriverError::InputSinkCreate)?
        .with_absolute_axis(&touch_x)
        .map_err(DriverError::InputSinkCreate)?
        .with_absolute_axis(&touch_y)
        .map_err(DriverError::InputSinkCreate)?
        .build()
        .map_err(DriverError::InputSinkCreate)?;

    Ok(device)
}
