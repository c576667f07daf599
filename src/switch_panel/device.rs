use std::time::Duration;

use rusb::{
    Context, Device, DeviceDescriptor, DeviceHandle, Direction, Recipient, RequestType,
    TransferType, UsbContext,
};
use tracing::{debug, trace};

use super::{DeviceError, FeedbackSink, PanelDevice};

/// Connection to a switch panel found on the USB bus.
///
/// Reports are read from the HID interface's interrupt-IN endpoint, LED
/// feedback goes out as a class-specific SET_REPORT control transfer.
pub struct SwitchPanel {
    _context: Context,
    handle: DeviceHandle<Context>,
    interface: u8,
    endpoint: u8,
    input_buf: Vec<u8>,
    timeout: Duration,
    product: String,
}

/// Where the panel's input reports arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputEndpoint {
    interface: u8,
    address: u8,
    max_packet_size: usize,
}

impl SwitchPanel {
    /// Open the first USB device whose product string equals `product_name`.
    ///
    /// Devices that cannot be opened or described are skipped.
    pub fn connect(product_name: &str, timeout: Duration) -> Result<Self, DeviceError> {
        let context = Context::new()?;
        let devices = context.devices()?;

        let found = find_by_product(devices.iter(), product_name, |device| {
            let inspected = inspect(device);
            if let Err(err) = &inspected {
                trace!(
                    bus = device.bus_number(),
                    address = device.address(),
                    error = %err,
                    "skipping USB device that cannot be inspected"
                );
            }
            inspected
        });
        let Some((device, (handle, desc), product)) = found else {
            return Err(DeviceError::NotFound(product_name.to_string()));
        };

        debug!(
            vendor_id = %format!("{:04x}", desc.vendor_id()),
            product_id = %format!("{:04x}", desc.product_id()),
            "matched {product}"
        );

        let input = find_input_endpoint(&device)?;

        // Linux binds usbhid to the panel; other platforms report NotSupported.
        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            debug!(error = %err, "kernel driver auto-detach unavailable");
        }
        handle.claim_interface(input.interface)?;

        Ok(Self {
            _context: context,
            handle,
            interface: input.interface,
            endpoint: input.address,
            input_buf: vec![0; input.max_packet_size.max(1)],
            timeout,
            product,
        })
    }

    pub fn product(&self) -> &str {
        &self.product
    }
}

impl PanelDevice for SwitchPanel {
    fn read_report(&mut self) -> Result<Option<Vec<u8>>, DeviceError> {
        match self
            .handle
            .read_interrupt(self.endpoint, &mut self.input_buf, self.timeout)
        {
            Ok(0) => Ok(None),
            Ok(len) => Ok(Some(self.input_buf[..len].to_vec())),
            Err(rusb::Error::Timeout) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl FeedbackSink for SwitchPanel {
    fn send_feature_report(&mut self, report: &[u8]) -> Result<(), DeviceError> {
        let (&report_id, data) = report
            .split_first()
            .ok_or(DeviceError::EmptyFeatureReport)?;

        // Report id 0 means the device does not use numbered reports, so only
        // the payload goes on the wire.
        let payload = if report_id == 0 { data } else { report };

        let request_type =
            rusb::request_type(Direction::Out, RequestType::Class, Recipient::Interface);
        let value = (HID_REPORT_TYPE_FEATURE << 8) | u16::from(report_id);
        let written = self.handle.write_control(
            request_type,
            HID_SET_REPORT,
            value,
            u16::from(self.interface),
            payload,
            self.timeout,
        )?;

        if written != payload.len() {
            return Err(DeviceError::ShortWrite {
                written,
                expected: payload.len(),
            });
        }
        Ok(())
    }
}

type Inspected = (DeviceHandle<Context>, DeviceDescriptor);

fn inspect(device: &Device<Context>) -> Result<(Inspected, String), rusb::Error> {
    let desc = device.device_descriptor()?;
    let handle = device.open()?;
    let product = handle.read_product_string_ascii(&desc)?;
    Ok(((handle, desc), product))
}

/// First candidate whose product string is `product_name`. Candidates that
/// `inspect` fails on do not end the search.
fn find_by_product<C, H>(
    candidates: impl IntoIterator<Item = C>,
    product_name: &str,
    mut inspect: impl FnMut(&C) -> Result<(H, String), rusb::Error>,
) -> Option<(C, H, String)> {
    candidates.into_iter().find_map(|candidate| match inspect(&candidate) {
        Ok((inspected, product)) if product == product_name => {
            Some((candidate, inspected, product))
        }
        _ => None,
    })
}

fn find_input_endpoint(device: &Device<Context>) -> Result<InputEndpoint, DeviceError> {
    let config = device.active_config_descriptor()?;

    for interface in config.interfaces() {
        for descriptor in interface.descriptors() {
            if descriptor.class_code() != USB_CLASS_HID {
                continue;
            }
            let endpoint = descriptor.endpoint_descriptors().find(|endpoint| {
                endpoint.direction() == Direction::In
                    && endpoint.transfer_type() == TransferType::Interrupt
            });
            if let Some(endpoint) = endpoint {
                return Ok(InputEndpoint {
                    interface: descriptor.interface_number(),
                    address: endpoint.address(),
                    max_packet_size: usize::from(endpoint.max_packet_size()),
                });
            }
        }
    }

    Err(DeviceError::NoInputEndpoint)
}

const USB_CLASS_HID: u8 = 0x03;
const HID_SET_REPORT: u8 = 0x09;
const HID_REPORT_TYPE_FEATURE: u16 = 0x03;

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: &str = "Saitek Pro Flight Switch Panel";

    fn by_product(candidates: Vec<Result<&'static str, rusb::Error>>) -> Option<(usize, String)> {
        let indexed = candidates.into_iter().enumerate();
        find_by_product(indexed, PANEL, |(_, candidate)| {
            candidate.clone().map(|product| ((), product.to_string()))
        })
        .map(|((index, _), (), product)| (index, product))
    }

    #[test]
    fn unreadable_devices_do_not_end_the_search() {
        let found = by_product(vec![
            Err(rusb::Error::Io),
            Err(rusb::Error::Access),
            Ok("USB Receiver"),
            Ok(PANEL),
        ]);
        let (index, product) = found.unwrap();
        assert_eq!(index, 3);
        assert_eq!(product, PANEL);
    }

    #[test]
    fn first_matching_device_wins() {
        let found = by_product(vec![Ok(PANEL), Ok(PANEL)]);
        assert_eq!(found.map(|(index, _)| index), Some(0));
    }

    #[test]
    fn nothing_matches() {
        assert!(by_product(vec![Err(rusb::Error::Pipe), Ok("Keyboard")]).is_none());
        assert!(by_product(vec![]).is_none());
    }
}
