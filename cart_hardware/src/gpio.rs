//! Raspberry Pi backends: H-bridge motor and buzzer/LED on GPIO, proximity
//! sensors through an MCP3008 ADC on SPI0.

use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use cart_traits::{
    ActionCode, Alert, BoxError, Direction, Mood, Motor, ProximitySensor, Song, Speed, Wheel,
    WheelDrive,
};

use crate::error::{HwError, Result};

const PWM_HZ: f64 = 100.0;
const SPI_CLOCK_HZ: u32 = 1_350_000;

fn output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    let pin = gpio
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?;
    Ok(pin.into_output_low())
}

fn gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))
}

/// BCM pin numbers for the motor bridge.
#[derive(Debug, Clone, Copy)]
pub struct MotorPins {
    pub left_fwd: u8,
    pub left_back: u8,
    pub right_fwd: u8,
    pub right_back: u8,
}

struct Bridge {
    fwd: OutputPin,
    back: OutputPin,
}

impl Bridge {
    fn drive(&mut self, drive: WheelDrive, duty: f64) -> Result<()> {
        let (on, off) = match drive {
            WheelDrive::Forward => (&mut self.fwd, &mut self.back),
            WheelDrive::Back => (&mut self.back, &mut self.fwd),
            WheelDrive::Off => {
                self.fwd.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
                self.back.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
                self.fwd.set_low();
                self.back.set_low();
                return Ok(());
            }
        };
        off.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
        off.set_low();
        if duty >= 1.0 {
            on.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
            on.set_high();
        } else {
            on.set_pwm_frequency(PWM_HZ, duty)
                .map_err(|e| HwError::Gpio(e.to_string()))?;
        }
        Ok(())
    }
}

/// Two-wheel differential drive. Turning runs only the outer wheel.
pub struct GpioMotor {
    left: Bridge,
    right: Bridge,
    enabled: bool,
}

impl GpioMotor {
    pub fn new(pins: MotorPins) -> Result<Self> {
        let gpio = gpio()?;
        Ok(Self {
            left: Bridge {
                fwd: output(&gpio, pins.left_fwd)?,
                back: output(&gpio, pins.left_back)?,
            },
            right: Bridge {
                fwd: output(&gpio, pins.right_fwd)?,
                back: output(&gpio, pins.right_back)?,
            },
            enabled: false,
        })
    }

    fn halt(&mut self) -> Result<()> {
        self.left.drive(WheelDrive::Off, 0.0)?;
        self.right.drive(WheelDrive::Off, 0.0)
    }
}

const fn duty(speed: Speed) -> f64 {
    match speed {
        Speed::Stop => 0.0,
        Speed::Medium => 0.65,
        Speed::Fast => 1.0,
    }
}

impl Motor for GpioMotor {
    fn start(&mut self) -> std::result::Result<(), BoxError> {
        self.enabled = true;
        tracing::info!("motor bridge enabled");
        Ok(())
    }

    fn stop(&mut self) -> std::result::Result<(), BoxError> {
        self.enabled = false;
        self.halt()?;
        tracing::info!("motor bridge disabled");
        Ok(())
    }

    fn set_action(&mut self, action: ActionCode) -> std::result::Result<(), BoxError> {
        let (dir, speed) = match action {
            ActionCode::Move(dir, speed) if self.enabled && speed != Speed::Stop => (dir, speed),
            _ => return Ok(self.halt()?),
        };
        let d = duty(speed);
        let (left, right) = match dir {
            Direction::Straight => (WheelDrive::Forward, WheelDrive::Forward),
            Direction::Left => (WheelDrive::Off, WheelDrive::Forward),
            Direction::Right => (WheelDrive::Forward, WheelDrive::Off),
        };
        self.left.drive(left, d)?;
        self.right.drive(right, d)?;
        Ok(())
    }

    fn drive_wheel(&mut self, wheel: Wheel, drive: WheelDrive) -> std::result::Result<(), BoxError> {
        let bridge = match wheel {
            Wheel::Left => &mut self.left,
            Wheel::Right => &mut self.right,
        };
        bridge.drive(drive, 1.0)?;
        Ok(())
    }
}

/// First note of each tune, in Hz. The buzzer holds it until silenced.
const fn tone(song: Song) -> f64 {
    match song {
        Song::PowerUp => 523.0,
        Song::PowerDown => 262.0,
        Song::Following => 659.0,
        Song::Waiting => 392.0,
        Song::Ok => 784.0,
        Song::KeyPress => 1047.0,
        Song::Help => 880.0,
    }
}

pub struct GpioAlert {
    led: OutputPin,
    buzzer: OutputPin,
}

impl GpioAlert {
    pub fn new(led: u8, buzzer: u8) -> Result<Self> {
        let gpio = gpio()?;
        Ok(Self {
            led: output(&gpio, led)?,
            buzzer: output(&gpio, buzzer)?,
        })
    }
}

impl Alert for GpioAlert {
    fn set_mood(&mut self, mood: Mood) -> std::result::Result<(), BoxError> {
        // No RGB backlight on this board; the LED blinks while lost.
        let blink = matches!(mood, Mood::Lost);
        if blink {
            self.led
                .set_pwm(Duration::from_millis(500), Duration::from_millis(250))
                .map_err(|e| HwError::Gpio(e.to_string()))?;
        } else {
            self.led.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
        }
        tracing::debug!(%mood, "mood");
        Ok(())
    }

    fn play(&mut self, song: Song) -> std::result::Result<(), BoxError> {
        self.buzzer
            .set_pwm_frequency(tone(song), 0.5)
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        Ok(())
    }

    fn silence(&mut self) -> std::result::Result<(), BoxError> {
        self.buzzer
            .clear_pwm()
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        self.buzzer.set_low();
        Ok(())
    }

    fn set_led(&mut self, on: bool) -> std::result::Result<(), BoxError> {
        self.led.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
        if on {
            self.led.set_high();
        } else {
            self.led.set_low();
        }
        Ok(())
    }
}

/// Left/right proximity sensors on two MCP3008 channels.
pub struct Mcp3008Proximity {
    spi: Spi,
    left: u8,
    right: u8,
}

impl Mcp3008Proximity {
    pub fn new(left: u8, right: u8) -> Result<Self> {
        for ch in [left, right] {
            if ch >= 8 {
                return Err(HwError::Channel(ch));
            }
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self { spi, left, right })
    }

    fn channel(&self, ch: u8) -> Result<i32> {
        // start bit, single-ended + channel, padding
        let tx = [0x01, (0x08 | ch) << 4, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok((i32::from(rx[1] & 0x03) << 8) | i32::from(rx[2]))
    }
}

impl ProximitySensor for Mcp3008Proximity {
    fn read(&mut self) -> std::result::Result<(i32, i32), BoxError> {
        Ok((self.channel(self.left)?, self.channel(self.right)?))
    }
}
