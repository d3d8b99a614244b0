//! USB descriptor model for the composite MIDI + CDC-ACM adapter.
//!
//! Every descriptor is an explicit, self-describing record with a
//! serialization function that computes its own length fields, instead of
//! packed struct literals whose correctness depends on memory layout.
//! Field layout and byte order (little-endian, no padding) follow USB 2.0
//! chapter 9, USB Audio Class 1.0 and USB CDC 1.1.
//!
//! The tree is static: it is built once at startup, validated by
//! [`Configuration::validate`], and never mutated. An inconsistency is a
//! construction defect, so validation panics rather than returning an
//! error - the host tests catch it long before the firmware ships.

use heapless::Vec;

use crate::config;
use crate::error::Error;

// Standard descriptor types (USB 2.0 §9.4)

pub const DT_DEVICE: u8 = 0x01;
pub const DT_CONFIGURATION: u8 = 0x02;
pub const DT_STRING: u8 = 0x03;
pub const DT_INTERFACE: u8 = 0x04;
pub const DT_ENDPOINT: u8 = 0x05;

/// Class-specific interface / endpoint descriptor types (Audio 1.0 §4.3).
pub const CS_INTERFACE: u8 = 0x24;
pub const CS_ENDPOINT: u8 = 0x25;

// Classes, subclasses, protocols

pub const USB_CLASS_AUDIO: u8 = 0x01;
pub const USB_CLASS_CDC: u8 = 0x02;
pub const USB_CLASS_CDC_DATA: u8 = 0x0A;
pub const AUDIO_SUBCLASS_CONTROL: u8 = 0x01;
pub const AUDIO_SUBCLASS_MIDI_STREAMING: u8 = 0x03;
pub const CDC_SUBCLASS_ACM: u8 = 0x02;
pub const CDC_PROTOCOL_AT: u8 = 0x01;

// Class-specific descriptor subtypes

pub const AC_HEADER: u8 = 0x01;
pub const MS_HEADER: u8 = 0x01;
pub const MIDI_IN_JACK: u8 = 0x02;
pub const MIDI_OUT_JACK: u8 = 0x03;
pub const MS_GENERAL: u8 = 0x01;
pub const CDC_TYPE_HEADER: u8 = 0x00;
pub const CDC_TYPE_CALL_MANAGEMENT: u8 = 0x01;
pub const CDC_TYPE_ACM: u8 = 0x02;
pub const CDC_TYPE_UNION: u8 = 0x06;

// Tree capacities

pub const MAX_INTERFACES: usize = 4;
pub const MAX_INTERFACE_ENDPOINTS: usize = 2;
pub const MAX_JACKS: usize = 8;
pub const MAX_JACK_SOURCES: usize = 2;
pub const MAX_ENDPOINT_JACKS: usize = 2;
pub const MAX_STREAMING_INTERFACES: usize = 2;

/// One class-specific descriptor may expand into this many bodies.
pub const MAX_CLASS_DESCRIPTORS: usize = 1 + MAX_JACKS;

const MAX_BODY: usize = 16;

/// Sufficient for the serialized configuration tree.
pub const CONFIG_BUFFER_SIZE: usize = 256;

/// LANGID for the index-0 string descriptor.
pub const LANG_US_ENGLISH: u16 = 0x0409;

/// Body of one descriptor: everything after bLength and bDescriptorType.
pub type DescriptorBody = Vec<u8, MAX_BODY>;

fn body_from(bytes: &[u8]) -> DescriptorBody {
    // MAX_BODY covers the largest class-specific body in the model.
    DescriptorBody::from_slice(bytes).unwrap()
}

/// Little-endian byte writer over a caller-provided buffer.
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, byte: u8) -> Result<(), Error> {
        if self.pos >= self.buf.len() {
            return Err(Error::BufferOverflow);
        }
        self.buf[self.pos] = byte;
        self.pos += 1;
        Ok(())
    }

    fn put_u16(&mut self, value: u16) -> Result<(), Error> {
        let bytes = value.to_le_bytes();
        self.put(bytes[0])?;
        self.put(bytes[1])
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for &b in bytes {
            self.put(b)?;
        }
        Ok(())
    }

    fn finish(self) -> usize {
        self.pos
    }
}

/// Standard device descriptor (USB 2.0 §9.6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// bcdUSB.
    pub usb_release: u16,
    /// 0 = class defined per interface.
    pub device_class: u8,
    pub device_sub_class: u8,
    pub device_protocol: u8,
    pub max_packet_size_0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    /// bcdDevice.
    pub device_release: u16,
    /// 1-based string descriptor indices.
    pub manufacturer: u8,
    pub product: u8,
    pub serial_number: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub const SIZE: usize = 18;

    pub fn serialize(&self) -> [u8; 18] {
        let usb = self.usb_release.to_le_bytes();
        let vid = self.vendor_id.to_le_bytes();
        let pid = self.product_id.to_le_bytes();
        let rel = self.device_release.to_le_bytes();
        [
            Self::SIZE as u8,
            DT_DEVICE,
            usb[0],
            usb[1],
            self.device_class,
            self.device_sub_class,
            self.device_protocol,
            self.max_packet_size_0,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            rel[0],
            rel[1],
            self.manufacturer,
            self.product,
            self.serial_number,
            self.num_configurations,
        ]
    }
}

/// A jack's position relative to the USB pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JackKind {
    /// Terminates inside the USB stream.
    Embedded,
    /// Models a physical or virtual connector outside the stream.
    External,
}

impl JackKind {
    fn wire(self) -> u8 {
        match self {
            JackKind::Embedded => 0x01,
            JackKind::External => 0x02,
        }
    }
}

/// One incoming pin of an OUT jack: (source jack, source pin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JackSource {
    pub jack_id: u8,
    pub source_pin: u8,
}

/// Node of the MIDI streaming interface's directed jack graph.
///
/// Source references model one-directional virtual cables, so every OUT
/// jack may only name jacks declared before it - the graph is acyclic by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jack {
    In {
        kind: JackKind,
        id: u8,
    },
    Out {
        kind: JackKind,
        id: u8,
        sources: Vec<JackSource, MAX_JACK_SOURCES>,
    },
}

impl Jack {
    /// IN jack (MIDI 1.0 Table B-7/B-8).
    pub fn input(kind: JackKind, id: u8) -> Self {
        Jack::In { kind, id }
    }

    /// Single-source OUT jack (MIDI 1.0 Table B-9/B-10).
    pub fn output(kind: JackKind, id: u8, source: JackSource) -> Self {
        Jack::Out {
            kind,
            id,
            sources: Vec::from_slice(&[source]).unwrap(),
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Jack::In { id, .. } | Jack::Out { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> JackKind {
        match self {
            Jack::In { kind, .. } | Jack::Out { kind, .. } => *kind,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Jack::In { .. } => 6,
            Jack::Out { sources, .. } => 7 + 2 * sources.len(),
        }
    }

    fn body(&self) -> DescriptorBody {
        match self {
            Jack::In { kind, id } => body_from(&[MIDI_IN_JACK, kind.wire(), *id, 0x00]),
            Jack::Out { kind, id, sources } => {
                let mut body = body_from(&[MIDI_OUT_JACK, kind.wire(), *id, sources.len() as u8]);
                for source in sources {
                    body.push(source.jack_id).unwrap();
                    body.push(source.source_pin).unwrap();
                }
                body.push(0x00).unwrap(); // iJack
                body
            }
        }
    }
}

/// Class-specific descriptor block attached to an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionalBlock {
    /// Audio-control header naming the streaming interfaces it collects
    /// (Audio 1.0 §4.3.2).
    AudioControlHeader {
        /// bcdADC.
        adc_release: u16,
        streaming_interfaces: Vec<u8, MAX_STREAMING_INTERFACES>,
    },
    /// MIDI streaming header plus the jack graph (MIDI 1.0 §B.4.3).
    MidiStreaming {
        /// bcdMSC.
        msc_release: u16,
        jacks: Vec<Jack, MAX_JACKS>,
    },
    /// CDC header, call management, ACM and union descriptors
    /// (CDC 1.1 §5.2.3).
    CdcAcm {
        /// bcdCDC.
        cdc_release: u16,
        call_capabilities: u8,
        acm_capabilities: u8,
        control_interface: u8,
        data_interface: u8,
    },
}

impl FunctionalBlock {
    /// Serialized size of the whole block, all nested descriptors
    /// included. For the header-bearing blocks this is also the value of
    /// their wTotalLength field.
    pub fn encoded_len(&self) -> usize {
        match self {
            FunctionalBlock::AudioControlHeader {
                streaming_interfaces,
                ..
            } => 8 + streaming_interfaces.len(),
            FunctionalBlock::MidiStreaming { jacks, .. } => {
                7 + jacks.iter().map(Jack::encoded_len).sum::<usize>()
            }
            FunctionalBlock::CdcAcm { .. } => 5 + 5 + 4 + 5,
        }
    }

    /// The block as individual CS_INTERFACE descriptor bodies, in
    /// declaration order.
    pub fn descriptors(&self) -> Vec<DescriptorBody, MAX_CLASS_DESCRIPTORS> {
        let mut out: Vec<DescriptorBody, MAX_CLASS_DESCRIPTORS> = Vec::new();
        match self {
            FunctionalBlock::AudioControlHeader {
                adc_release,
                streaming_interfaces,
            } => {
                let total = (self.encoded_len() as u16).to_le_bytes();
                let release = adc_release.to_le_bytes();
                let mut body = body_from(&[
                    AC_HEADER,
                    release[0],
                    release[1],
                    total[0],
                    total[1],
                    streaming_interfaces.len() as u8,
                ]);
                for &number in streaming_interfaces {
                    body.push(number).unwrap();
                }
                out.push(body).unwrap();
            }
            FunctionalBlock::MidiStreaming { msc_release, jacks } => {
                let total = (self.encoded_len() as u16).to_le_bytes();
                let release = msc_release.to_le_bytes();
                out.push(body_from(&[
                    MS_HEADER, release[0], release[1], total[0], total[1],
                ]))
                .unwrap();
                for jack in jacks {
                    out.push(jack.body()).unwrap();
                }
            }
            FunctionalBlock::CdcAcm {
                cdc_release,
                call_capabilities,
                acm_capabilities,
                control_interface,
                data_interface,
            } => {
                let release = cdc_release.to_le_bytes();
                out.push(body_from(&[CDC_TYPE_HEADER, release[0], release[1]]))
                    .unwrap();
                out.push(body_from(&[
                    CDC_TYPE_CALL_MANAGEMENT,
                    *call_capabilities,
                    *data_interface,
                ]))
                .unwrap();
                out.push(body_from(&[CDC_TYPE_ACM, *acm_capabilities]))
                    .unwrap();
                out.push(body_from(&[
                    CDC_TYPE_UNION,
                    *control_interface,
                    *data_interface,
                ]))
                .unwrap();
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Bulk,
    Interrupt,
}

impl TransferType {
    fn attributes(self) -> u8 {
        match self {
            TransferType::Bulk => 0x02,
            TransferType::Interrupt => 0x03,
        }
    }
}

/// Standard endpoint descriptor plus the optional class-specific
/// MS_GENERAL block naming the jacks embedded in the pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Wire address: bit 7 set = IN (device-to-host).
    pub address: u8,
    pub transfer: TransferType,
    pub max_packet_size: u16,
    /// Polling interval, meaningful for interrupt endpoints.
    pub interval: u8,
    pub embedded_jacks: Vec<u8, MAX_ENDPOINT_JACKS>,
}

impl Endpoint {
    pub fn bulk(address: u8, max_packet_size: u16, interval: u8) -> Self {
        Self {
            address,
            transfer: TransferType::Bulk,
            max_packet_size,
            interval,
            embedded_jacks: Vec::new(),
        }
    }

    pub fn interrupt(address: u8, max_packet_size: u16, interval: u8) -> Self {
        Self {
            address,
            transfer: TransferType::Interrupt,
            max_packet_size,
            interval,
            embedded_jacks: Vec::new(),
        }
    }

    /// Attach the MS_GENERAL jack association (MIDI 1.0 Table B-12).
    pub fn with_embedded_jack(mut self, jack_id: u8) -> Self {
        self.embedded_jacks.push(jack_id).unwrap();
        self
    }

    pub fn is_in(&self) -> bool {
        self.address & 0x80 != 0
    }

    pub fn encoded_len(&self) -> usize {
        let class = if self.embedded_jacks.is_empty() {
            0
        } else {
            4 + self.embedded_jacks.len()
        };
        7 + class
    }

    /// CS_ENDPOINT body, when the endpoint carries embedded jacks.
    pub fn class_body(&self) -> Option<DescriptorBody> {
        if self.embedded_jacks.is_empty() {
            return None;
        }
        let mut body = body_from(&[MS_GENERAL, self.embedded_jacks.len() as u8]);
        for &id in &self.embedded_jacks {
            body.push(id).unwrap();
        }
        Some(body)
    }
}

/// Standard interface descriptor with its class-specific block and
/// endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub number: u8,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
    pub functional: Option<FunctionalBlock>,
    pub endpoints: Vec<Endpoint, MAX_INTERFACE_ENDPOINTS>,
}

impl Interface {
    pub fn encoded_len(&self) -> usize {
        let functional = self.functional.as_ref().map_or(0, FunctionalBlock::encoded_len);
        let endpoints: usize = self.endpoints.iter().map(Endpoint::encoded_len).sum();
        9 + functional + endpoints
    }
}

/// The device's single configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub value: u8,
    /// bmAttributes; 0x80 = bus powered.
    pub attributes: u8,
    /// Maximum current draw in milliamps (halved on the wire).
    pub max_power_ma: u8,
    pub interfaces: Vec<Interface, MAX_INTERFACES>,
}

impl Configuration {
    /// wTotalLength: the configuration descriptor plus every nested
    /// interface, endpoint and class-specific descriptor.
    pub fn total_length(&self) -> u16 {
        let interfaces: usize = self.interfaces.iter().map(Interface::encoded_len).sum();
        (9 + interfaces) as u16
    }

    pub fn interface(&self, number: u8) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.number == number)
    }

    /// Serialize the full configuration tree into `buf`.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buf);
        w.put(9)?;
        w.put(DT_CONFIGURATION)?;
        w.put_u16(self.total_length())?;
        w.put(self.interfaces.len() as u8)?;
        w.put(self.value)?;
        w.put(0x00)?; // iConfiguration
        w.put(self.attributes)?;
        w.put(self.max_power_ma / 2)?;

        for iface in &self.interfaces {
            w.put(9)?;
            w.put(DT_INTERFACE)?;
            w.put(iface.number)?;
            w.put(0x00)?; // bAlternateSetting
            w.put(iface.endpoints.len() as u8)?;
            w.put(iface.class)?;
            w.put(iface.sub_class)?;
            w.put(iface.protocol)?;
            w.put(0x00)?; // iInterface

            if let Some(block) = &iface.functional {
                for body in block.descriptors() {
                    w.put((body.len() + 2) as u8)?;
                    w.put(CS_INTERFACE)?;
                    w.put_slice(&body)?;
                }
            }

            for ep in &iface.endpoints {
                w.put(7)?;
                w.put(DT_ENDPOINT)?;
                w.put(ep.address)?;
                w.put(ep.transfer.attributes())?;
                w.put_u16(ep.max_packet_size)?;
                w.put(ep.interval)?;
                if let Some(body) = ep.class_body() {
                    w.put((body.len() + 2) as u8)?;
                    w.put(CS_ENDPOINT)?;
                    w.put_slice(&body)?;
                }
            }
        }
        Ok(w.finish())
    }

    /// Check the structural invariants: dense interface numbers, resolvable
    /// cross-references, acyclic jack graph, per-direction endpoint address
    /// uniqueness. Panics on violation - an inconsistent tree is a defect,
    /// not a runtime condition.
    pub fn validate(&self) {
        for (position, iface) in self.interfaces.iter().enumerate() {
            assert_eq!(
                iface.number as usize, position,
                "interface numbers must be dense and in declaration order"
            );
        }

        let mut seen_addresses: Vec<u8, { MAX_INTERFACES * MAX_INTERFACE_ENDPOINTS }> = Vec::new();
        for iface in &self.interfaces {
            for ep in &iface.endpoints {
                assert!(
                    ep.max_packet_size > 0 && ep.max_packet_size <= 64,
                    "full-speed max packet size out of range"
                );
                if ep.transfer == TransferType::Interrupt {
                    assert!(ep.interval > 0, "interrupt endpoint needs a polling interval");
                }
                assert!(
                    !seen_addresses.contains(&ep.address),
                    "endpoint address reused within a direction"
                );
                seen_addresses.push(ep.address).unwrap();
                if !ep.embedded_jacks.is_empty() {
                    assert!(
                        matches!(iface.functional, Some(FunctionalBlock::MidiStreaming { .. })),
                        "embedded jacks require a MIDI streaming interface"
                    );
                }
            }
        }

        for iface in &self.interfaces {
            match &iface.functional {
                Some(FunctionalBlock::AudioControlHeader {
                    streaming_interfaces,
                    ..
                }) => {
                    for &number in streaming_interfaces {
                        let target = self
                            .interface(number)
                            .expect("audio-control header collects a missing interface");
                        assert_eq!(target.class, USB_CLASS_AUDIO);
                        assert_eq!(target.sub_class, AUDIO_SUBCLASS_MIDI_STREAMING);
                    }
                }
                Some(FunctionalBlock::MidiStreaming { jacks, .. }) => {
                    let mut declared: Vec<u8, MAX_JACKS> = Vec::new();
                    for jack in jacks {
                        assert!(!declared.contains(&jack.id()), "duplicate jack ID");
                        if let Jack::Out { sources, .. } = jack {
                            assert!(!sources.is_empty(), "OUT jack without input pins");
                            for source in sources {
                                assert!(
                                    declared.contains(&source.jack_id),
                                    "jack source must reference an already-declared jack"
                                );
                                assert!(source.source_pin >= 1, "source pins are 1-based");
                            }
                        }
                        declared.push(jack.id()).unwrap();
                    }
                    for ep in &iface.endpoints {
                        for &id in &ep.embedded_jacks {
                            let jack = jacks
                                .iter()
                                .find(|j| j.id() == id)
                                .expect("endpoint references an undeclared jack");
                            assert_eq!(
                                jack.kind(),
                                JackKind::Embedded,
                                "only embedded jacks terminate in a USB pipe"
                            );
                            // Host-to-device traffic enters through an IN
                            // jack; device-to-host traffic leaves through
                            // an OUT jack.
                            let matches_direction = match jack {
                                Jack::In { .. } => !ep.is_in(),
                                Jack::Out { .. } => ep.is_in(),
                            };
                            assert!(
                                matches_direction,
                                "endpoint direction does not match its embedded jack"
                            );
                        }
                    }
                }
                Some(FunctionalBlock::CdcAcm {
                    control_interface,
                    data_interface,
                    ..
                }) => {
                    assert_eq!(
                        *control_interface, iface.number,
                        "CDC union must name its own control interface"
                    );
                    let data = self
                        .interface(*data_interface)
                        .expect("CDC union names a missing data interface");
                    assert_eq!(data.class, USB_CLASS_CDC_DATA);
                }
                None => {}
            }
        }
    }
}

// The adapter's concrete descriptor tree

const JACK_IN_EMBEDDED: u8 = 0x01;
const JACK_OUT_EXTERNAL: u8 = 0x02;
const JACK_IN_EXTERNAL_A: u8 = 0x03;
const JACK_OUT_EMBEDDED_A: u8 = 0x04;
const JACK_IN_EXTERNAL_B: u8 = 0x05;
const JACK_OUT_EMBEDDED_B: u8 = 0x06;

/// Jack named by the MIDI OUT endpoint's MS_GENERAL block.
pub const EP_MIDI_OUT_JACK: u8 = JACK_IN_EMBEDDED;
/// Jack named by the MIDI IN endpoint's MS_GENERAL block.
pub const EP_MIDI_IN_JACK: u8 = JACK_OUT_EMBEDDED_A;

/// The adapter's device descriptor.
pub fn device_descriptor() -> DeviceDescriptor {
    DeviceDescriptor {
        usb_release: 0x0200,
        device_class: 0x00,
        device_sub_class: 0x00,
        device_protocol: 0x00,
        max_packet_size_0: config::CONTROL_MAX_PACKET_SIZE,
        vendor_id: config::USB_VID,
        product_id: config::USB_PID,
        device_release: config::USB_DEVICE_RELEASE,
        manufacturer: config::STRING_MANUFACTURER,
        product: config::STRING_PRODUCT,
        serial_number: config::STRING_SERIAL,
        num_configurations: 1,
    }
}

/// The adapter's configuration tree, validated.
///
/// Three virtual cables: one carries host MIDI out to an external port,
/// two carry external inputs back to the host.
pub fn configuration() -> Configuration {
    let mut jacks: Vec<Jack, MAX_JACKS> = Vec::new();
    for jack in [
        Jack::input(JackKind::Embedded, JACK_IN_EMBEDDED),
        Jack::output(
            JackKind::External,
            JACK_OUT_EXTERNAL,
            JackSource {
                jack_id: JACK_IN_EMBEDDED,
                source_pin: 1,
            },
        ),
        Jack::input(JackKind::External, JACK_IN_EXTERNAL_A),
        Jack::output(
            JackKind::Embedded,
            JACK_OUT_EMBEDDED_A,
            JackSource {
                jack_id: JACK_IN_EXTERNAL_A,
                source_pin: 1,
            },
        ),
        Jack::input(JackKind::External, JACK_IN_EXTERNAL_B),
        Jack::output(
            JackKind::Embedded,
            JACK_OUT_EMBEDDED_B,
            JackSource {
                jack_id: JACK_IN_EXTERNAL_B,
                source_pin: 1,
            },
        ),
    ] {
        jacks.push(jack).unwrap();
    }

    let audio_control = Interface {
        number: config::AUDIO_CONTROL_INTERFACE,
        class: USB_CLASS_AUDIO,
        sub_class: AUDIO_SUBCLASS_CONTROL,
        protocol: 0x00,
        functional: Some(FunctionalBlock::AudioControlHeader {
            adc_release: 0x0100,
            streaming_interfaces: Vec::from_slice(&[config::MIDI_STREAMING_INTERFACE]).unwrap(),
        }),
        endpoints: Vec::new(),
    };

    let midi_streaming = Interface {
        number: config::MIDI_STREAMING_INTERFACE,
        class: USB_CLASS_AUDIO,
        sub_class: AUDIO_SUBCLASS_MIDI_STREAMING,
        protocol: 0x00,
        functional: Some(FunctionalBlock::MidiStreaming {
            msc_release: 0x0100,
            jacks,
        }),
        endpoints: Vec::from_slice(&[
            Endpoint::bulk(config::EP_MIDI_OUT, config::MAX_PACKET_SIZE as u16, 0)
                .with_embedded_jack(EP_MIDI_OUT_JACK),
            Endpoint::bulk(config::EP_MIDI_IN, config::MAX_PACKET_SIZE as u16, 0)
                .with_embedded_jack(EP_MIDI_IN_JACK),
        ])
        .unwrap(),
    };

    let cdc_control = Interface {
        number: config::CDC_COMM_INTERFACE,
        class: USB_CLASS_CDC,
        sub_class: CDC_SUBCLASS_ACM,
        protocol: CDC_PROTOCOL_AT,
        functional: Some(FunctionalBlock::CdcAcm {
            cdc_release: 0x0110,
            call_capabilities: 0x00,
            acm_capabilities: 0x00,
            control_interface: config::CDC_COMM_INTERFACE,
            data_interface: config::CDC_DATA_INTERFACE,
        }),
        endpoints: Vec::from_slice(&[Endpoint::interrupt(
            config::EP_CDC_NOTIF,
            config::CDC_NOTIF_PACKET_SIZE,
            config::CDC_NOTIF_INTERVAL_MS,
        )])
        .unwrap(),
    };

    let cdc_data = Interface {
        number: config::CDC_DATA_INTERFACE,
        class: USB_CLASS_CDC_DATA,
        sub_class: 0x00,
        protocol: 0x00,
        functional: None,
        endpoints: Vec::from_slice(&[
            Endpoint::bulk(
                config::EP_CDC_DATA_OUT,
                config::MAX_PACKET_SIZE as u16,
                config::CDC_DATA_INTERVAL_MS,
            ),
            Endpoint::bulk(
                config::EP_CDC_DATA_IN,
                config::MAX_PACKET_SIZE as u16,
                config::CDC_DATA_INTERVAL_MS,
            ),
        ])
        .unwrap(),
    };

    let configuration = Configuration {
        value: 1,
        attributes: 0x80,
        max_power_ma: config::USB_MAX_POWER_MA,
        interfaces: Vec::from_slice(&[audio_control, midi_streaming, cdc_control, cdc_data])
            .unwrap(),
    };
    configuration.validate();
    configuration
}

/// Device string table; entries are referenced by 1-based index.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    pub manufacturer: &'a str,
    pub product: &'a str,
    pub serial: &'a str,
}

impl<'a> StringTable<'a> {
    pub fn entry(&self, index: u8) -> Option<&'a str> {
        match index {
            config::STRING_MANUFACTURER => Some(self.manufacturer),
            config::STRING_PRODUCT => Some(self.product),
            config::STRING_SERIAL => Some(self.serial),
            _ => None,
        }
    }

    /// Serialize the string descriptor for `index`; index 0 is the LANGID
    /// table.
    pub fn descriptor(&self, index: u8, buf: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buf);
        if index == 0 {
            w.put(4)?;
            w.put(DT_STRING)?;
            w.put_u16(LANG_US_ENGLISH)?;
            return Ok(w.finish());
        }
        let text = self.entry(index).ok_or(Error::InvalidStringIndex)?;
        let units = text.encode_utf16().count();
        let length = 2 + 2 * units;
        if length > usize::from(u8::MAX) {
            return Err(Error::BufferOverflow);
        }
        w.put(length as u8)?;
        w.put(DT_STRING)?;
        for unit in text.encode_utf16() {
            w.put_u16(unit)?;
        }
        Ok(w.finish())
    }
}

/// Render the MCU's 96-bit unique ID as the uppercase-hex serial string.
pub fn render_serial<'a>(
    uid: &[u8; config::UNIQUE_ID_LEN],
    out: &'a mut [u8; config::SERIAL_HEX_LEN],
) -> &'a str {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for (i, &byte) in uid.iter().enumerate() {
        out[2 * i] = HEX[usize::from(byte >> 4)];
        out[2 * i + 1] = HEX[usize::from(byte & 0x0F)];
    }
    core::str::from_utf8(out).unwrap_or("")
}
