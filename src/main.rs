//! STM32F103 binary: bring up the clocks, UARTs and USB peripheral, then
//! run the non-preemptible poll loop.
//!
//! Requires the `embedded` feature and a `thumbv7m-none-eabi` target:
//!
//! ```text
//! cargo build --release --features embedded --target thumbv7m-none-eabi
//! ```
//!
//! The loop services the USB device (receive and control callbacks run to
//! completion inside `poll`), then gives the debounced button one tick.
//! The USART1 receive interrupt only raises a flag; the tap itself is
//! sent from the loop, so the transport sees a single writer.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m_rt::entry;
use defmt::{info, warn};
use nb::block;
use static_cell::StaticCell;
use stm32f1xx_hal::pac::{self, interrupt};
use stm32f1xx_hal::prelude::*;
use stm32f1xx_hal::serial::{Config as SerialConfig, Serial, Tx};
use stm32f1xx_hal::usb::{Peripheral, UsbBus};
use usb_device::device::UsbDeviceState;
use usb_device::prelude::*;
use {defmt_rtt as _, panic_probe as _};

use midilink::button::{self, NoteButton};
use midilink::config;
use midilink::diag::DiagnosticSink;
use midilink::dispatch;
use midilink::usb::composite::CompositeClass;
use midilink::usb::descriptors;

/// Base address of the STM32F1 96-bit unique device ID.
const UNIQUE_ID_ADDR: usize = 0x1FFF_F7E8;

static SERIAL_BUF: StaticCell<[u8; config::SERIAL_HEX_LEN]> = StaticCell::new();

/// Set by the USART1 receive interrupt, drained by the main loop.
static TAP_REQUEST: AtomicBool = AtomicBool::new(false);

/// Debug hex dumps go to USART1, raw MIDI pass-through bytes to USART3.
struct UartDiag {
    debug: Tx<pac::USART1>,
    aux: Tx<pac::USART3>,
}

impl DiagnosticSink for UartDiag {
    fn debug(&mut self, byte: u8) {
        block!(self.debug.write(byte)).ok();
    }

    fn aux(&mut self, byte: u8) {
        block!(self.aux.write(byte)).ok();
    }
}

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();

    let mut flash = dp.FLASH.constrain();
    let rcc = dp.RCC.constrain();
    let clocks = rcc
        .cfgr
        .use_hse(8.MHz())
        .sysclk(48.MHz())
        .pclk1(24.MHz())
        .freeze(&mut flash.acr);
    assert!(clocks.usbclk_valid());

    let mut afio = dp.AFIO.constrain();
    let mut gpioa = dp.GPIOA.split();
    let mut gpiob = dp.GPIOB.split();
    let mut gpioc = dp.GPIOC.split();

    // USART1: debug console, receive interrupt fires note taps.
    let serial1 = Serial::new(
        dp.USART1,
        (
            gpioa.pa9.into_alternate_push_pull(&mut gpioa.crh),
            gpioa.pa10,
        ),
        &mut afio.mapr,
        SerialConfig::default().baudrate(115_200.bps()),
        &clocks,
    );
    let (debug_tx, mut debug_rx) = serial1.split();
    debug_rx.listen();

    // USART3: auxiliary output for the MIDI pass-through bytes.
    let serial3 = Serial::new(
        dp.USART3,
        (
            gpiob.pb10.into_alternate_push_pull(&mut gpiob.crh),
            gpiob.pb11,
        ),
        &mut afio.mapr,
        SerialConfig::default().baudrate(31_250.bps()),
        &clocks,
    );
    let (aux_tx, _aux_rx) = serial3.split();

    let mut diag = UartDiag {
        debug: debug_tx,
        aux: aux_tx,
    };

    // Activity LEDs and the note button.
    let mut led_midi = gpiob.pb8.into_push_pull_output(&mut gpiob.crh);
    let mut led_cdc = gpiob.pb9.into_push_pull_output(&mut gpiob.crh);
    let button_pin = gpioc.pc1.into_pull_up_input(&mut gpioc.crl);

    // Pull D+ low long enough for the host to notice a re-plug after
    // reset, then hand the pins to the USB peripheral.
    let mut usb_dp = gpioa.pa12.into_push_pull_output(&mut gpioa.crh);
    usb_dp.set_low();
    cortex_m::asm::delay(clocks.sysclk().raw() / 100);

    let usb_bus = UsbBus::new(Peripheral {
        usb: dp.USB,
        pin_dm: gpioa.pa11,
        pin_dp: usb_dp.into_floating_input(&mut gpioa.crh),
    });

    let mut composite = CompositeClass::new(&usb_bus);

    let uid = unsafe { core::ptr::read_volatile(UNIQUE_ID_ADDR as *const [u8; 12]) };
    let serial = descriptors::render_serial(&uid, SERIAL_BUF.init([0; config::SERIAL_HEX_LEN]));

    let mut usb_dev = UsbDeviceBuilder::new(&usb_bus, UsbVidPid(config::USB_VID, config::USB_PID))
        .manufacturer(config::USB_MANUFACTURER)
        .product(config::USB_PRODUCT)
        .serial_number(serial)
        .device_release(config::USB_DEVICE_RELEASE)
        .max_packet_size_0(config::CONTROL_MAX_PACKET_SIZE)
        .build();

    unsafe { pac::NVIC::unmask(pac::Interrupt::USART1) };

    info!("midilink up, serial {}", serial);

    let mut note_button = NoteButton::new();

    loop {
        if usb_dev.poll(&mut [&mut composite]) {
            match dispatch::on_midi_rx(&mut composite, &mut diag) {
                Ok(n) if n > 0 => led_midi.toggle(),
                Ok(_) => {}
                Err(e) => warn!("MIDI receive path: {}", e),
            }
            match dispatch::on_cdc_rx(&mut composite, &mut diag) {
                Ok(n) if n > 0 => led_cdc.toggle(),
                Ok(_) => {}
                Err(e) => warn!("CDC receive path: {}", e),
            }
        }

        if usb_dev.state() != UsbDeviceState::Configured {
            continue;
        }

        if TAP_REQUEST.swap(false, Ordering::AcqRel) {
            if let Err(e) = button::send_note_tap(&mut composite) {
                warn!("serial-triggered tap: {}", e);
            }
        }

        match note_button.tick(button_pin.is_low(), &mut composite) {
            Ok(Some(_edge)) => diag.debug(b'.'),
            Ok(None) => {}
            Err(e) => warn!("button tap: {}", e),
        }
    }
}

#[interrupt]
fn USART1() {
    let usart = unsafe { &(*pac::USART1::ptr()) };
    if usart.sr.read().rxne().bit_is_set() {
        let byte = usart.dr.read().dr().bits() as u8;
        if byte != b'\r' && byte != b'\n' {
            TAP_REQUEST.store(true, Ordering::Release);
        }
    }
}
