//! Hardware bridge: the descriptor model mapped onto the `usb-device`
//! stack.
//!
//! The class allocates the model's interfaces and endpoints (at their
//! fixed addresses), replays the model's class-specific descriptor blocks
//! into the bus's descriptor writer during enumeration, and answers the
//! CDC control requests. Data traffic flows through the [`UsbPort`] view
//! of the allocated endpoints, so the dispatcher and the note encoder are
//! identical on hardware and under test.

use usb_device::class_prelude::*;
use usb_device::Result as UsbResult;
use usb_device::UsbError;

use crate::cdc;
use crate::config;
use crate::error::Error;
use crate::usb::descriptors::{self, Configuration};
use crate::usb::UsbPort;

pub struct CompositeClass<'a, B: UsbBus> {
    audio_control_if: InterfaceNumber,
    midi_streaming_if: InterfaceNumber,
    cdc_control_if: InterfaceNumber,
    cdc_data_if: InterfaceNumber,
    midi_out_ep: EndpointOut<'a, B>,
    midi_in_ep: EndpointIn<'a, B>,
    notif_ep: EndpointIn<'a, B>,
    cdc_out_ep: EndpointOut<'a, B>,
    cdc_in_ep: EndpointIn<'a, B>,
    configuration: Configuration,
    /// Transient SERIAL_STATE echo, rebuilt on every
    /// SET_CONTROL_LINE_STATE.
    serial_state: [u8; cdc::SERIAL_STATE_NOTIFICATION_SIZE],
    /// Latest line coding the host pushed with SET_LINE_CODING.
    line_coding: Option<cdc::LineCoding>,
}

impl<'a, B: UsbBus> CompositeClass<'a, B> {
    /// Allocate interfaces and endpoints for the adapter's descriptor
    /// tree.
    ///
    /// Panics if the allocator disagrees with the model's interface
    /// numbering or endpoint addresses - both are cross-referenced by
    /// class descriptors, so a mismatch is a construction defect.
    pub fn new(alloc: &'a UsbBusAllocator<B>) -> Self {
        let configuration = descriptors::configuration();

        let audio_control_if = alloc.interface();
        let midi_streaming_if = alloc.interface();
        let cdc_control_if = alloc.interface();
        let cdc_data_if = alloc.interface();
        assert_eq!(u8::from(audio_control_if), config::AUDIO_CONTROL_INTERFACE);
        assert_eq!(u8::from(midi_streaming_if), config::MIDI_STREAMING_INTERFACE);
        assert_eq!(u8::from(cdc_control_if), config::CDC_COMM_INTERFACE);
        assert_eq!(u8::from(cdc_data_if), config::CDC_DATA_INTERFACE);

        CompositeClass {
            audio_control_if,
            midi_streaming_if,
            cdc_control_if,
            cdc_data_if,
            midi_out_ep: alloc
                .alloc(
                    Some(EndpointAddress::from(config::EP_MIDI_OUT)),
                    EndpointType::Bulk,
                    config::MAX_PACKET_SIZE as u16,
                    0,
                )
                .expect("MIDI OUT endpoint"),
            midi_in_ep: alloc
                .alloc(
                    Some(EndpointAddress::from(config::EP_MIDI_IN)),
                    EndpointType::Bulk,
                    config::MAX_PACKET_SIZE as u16,
                    0,
                )
                .expect("MIDI IN endpoint"),
            notif_ep: alloc
                .alloc(
                    Some(EndpointAddress::from(config::EP_CDC_NOTIF)),
                    EndpointType::Interrupt,
                    config::CDC_NOTIF_PACKET_SIZE,
                    config::CDC_NOTIF_INTERVAL_MS,
                )
                .expect("CDC notification endpoint"),
            cdc_out_ep: alloc
                .alloc(
                    Some(EndpointAddress::from(config::EP_CDC_DATA_OUT)),
                    EndpointType::Bulk,
                    config::MAX_PACKET_SIZE as u16,
                    config::CDC_DATA_INTERVAL_MS,
                )
                .expect("CDC data OUT endpoint"),
            cdc_in_ep: alloc
                .alloc(
                    Some(EndpointAddress::from(config::EP_CDC_DATA_IN)),
                    EndpointType::Bulk,
                    config::MAX_PACKET_SIZE as u16,
                    config::CDC_DATA_INTERVAL_MS,
                )
                .expect("CDC data IN endpoint"),
            configuration,
            serial_state: cdc::serial_state_notification(0),
            line_coding: None,
        }
    }

    /// The descriptor model backing this class.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// The last SERIAL_STATE notification built for the host.
    pub fn serial_state(&self) -> &[u8; cdc::SERIAL_STATE_NOTIFICATION_SIZE] {
        &self.serial_state
    }

    /// The line coding most recently configured by the host, if any.
    pub fn line_coding(&self) -> Option<&cdc::LineCoding> {
        self.line_coding.as_ref()
    }

    fn write_class_descriptors(
        &self,
        interface: u8,
        writer: &mut DescriptorWriter,
    ) -> UsbResult<()> {
        if let Some(block) = self
            .configuration
            .interface(interface)
            .and_then(|i| i.functional.as_ref())
        {
            for body in block.descriptors() {
                writer.write(descriptors::CS_INTERFACE, &body)?;
            }
        }
        Ok(())
    }

    fn write_endpoint_class(&self, address: u8, writer: &mut DescriptorWriter) -> UsbResult<()> {
        let endpoint = self
            .configuration
            .interfaces
            .iter()
            .flat_map(|i| i.endpoints.iter())
            .find(|e| e.address == address);
        if let Some(body) = endpoint.and_then(descriptors::Endpoint::class_body) {
            writer.write(descriptors::CS_ENDPOINT, &body)?;
        }
        Ok(())
    }
}

impl<B: UsbBus> UsbClass<B> for CompositeClass<'_, B> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> UsbResult<()> {
        writer.interface(
            self.audio_control_if,
            descriptors::USB_CLASS_AUDIO,
            descriptors::AUDIO_SUBCLASS_CONTROL,
            0x00,
        )?;
        self.write_class_descriptors(config::AUDIO_CONTROL_INTERFACE, writer)?;

        writer.interface(
            self.midi_streaming_if,
            descriptors::USB_CLASS_AUDIO,
            descriptors::AUDIO_SUBCLASS_MIDI_STREAMING,
            0x00,
        )?;
        self.write_class_descriptors(config::MIDI_STREAMING_INTERFACE, writer)?;
        writer.endpoint(&self.midi_out_ep)?;
        self.write_endpoint_class(config::EP_MIDI_OUT, writer)?;
        writer.endpoint(&self.midi_in_ep)?;
        self.write_endpoint_class(config::EP_MIDI_IN, writer)?;

        writer.interface(
            self.cdc_control_if,
            descriptors::USB_CLASS_CDC,
            descriptors::CDC_SUBCLASS_ACM,
            descriptors::CDC_PROTOCOL_AT,
        )?;
        self.write_class_descriptors(config::CDC_COMM_INTERFACE, writer)?;
        writer.endpoint(&self.notif_ep)?;

        writer.interface(self.cdc_data_if, descriptors::USB_CLASS_CDC_DATA, 0x00, 0x00)?;
        writer.endpoint(&self.cdc_out_ep)?;
        writer.endpoint(&self.cdc_in_ep)?;

        Ok(())
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = xfer.request();
        if !(req.request_type == control::RequestType::Class
            && req.recipient == control::Recipient::Interface
            && req.index == u16::from(u8::from(self.cdc_control_if)))
        {
            return;
        }

        let request = req.request;
        let value = req.value;
        let transfer_len = xfer.data().len();

        match cdc::handle_request(request, transfer_len) {
            cdc::RequestOutcome::Accepted => {
                if request == cdc::REQ_SET_CONTROL_LINE_STATE {
                    // Echo DTR/RTS into the transient notification buffer;
                    // actually transmitting it on the notification endpoint
                    // is optional and skipped.
                    self.serial_state = cdc::serial_state_notification(value);
                } else if request == cdc::REQ_SET_LINE_CODING {
                    self.line_coding = cdc::LineCoding::from_bytes(xfer.data()).ok();
                }
                xfer.accept().ok();
            }
            cdc::RequestOutcome::Rejected => {
                xfer.reject().ok();
            }
        }
    }
}

impl<B: UsbBus> UsbPort for CompositeClass<'_, B> {
    fn read_packet(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, Error> {
        let result = match endpoint {
            config::EP_MIDI_OUT => self.midi_out_ep.read(buf),
            config::EP_CDC_DATA_OUT => self.cdc_out_ep.read(buf),
            _ => return Err(Error::InvalidEndpoint),
        };
        match result {
            Ok(len) => Ok(len),
            Err(UsbError::WouldBlock) => Ok(0),
            Err(_) => Err(Error::Usb),
        }
    }

    fn write_packet(&mut self, endpoint: u8, data: &[u8]) -> Result<(), Error> {
        let result = match endpoint {
            config::EP_MIDI_IN => self.midi_in_ep.write(data),
            config::EP_CDC_DATA_IN => self.cdc_in_ep.write(data),
            config::EP_CDC_NOTIF => self.notif_ep.write(data),
            _ => return Err(Error::InvalidEndpoint),
        };
        match result {
            Ok(_) => Ok(()),
            Err(UsbError::WouldBlock) => Err(Error::EndpointBusy),
            Err(_) => Err(Error::Usb),
        }
    }
}
