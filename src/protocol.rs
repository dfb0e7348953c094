//! Wire protocol definitions shared by the controller and the host client.

/// Terminates every response to a recognised opcode
pub const TERMINATOR: u8 = 0xFF;

/// ADC reference voltage in millivolts
pub const VREF_MV: u32 = 2410;

/// ADC full scale count (10 bit)
pub const ADC_FULL_SCALE: u32 = 1023;

/// Raw samples summed for each averaged read
pub const SAMPLE_COUNT: u32 = 204;

/// Delay between raw samples during an averaged read
pub const SAMPLE_DELAY_MS: u32 = 1;

/// Depth of the per-channel voltage history
pub const HISTORY_LEN: usize = 10;

/// Charge threshold, also used to seed unfilled history slots
pub const CHARGE_THRESHOLD_MV: u32 = 1500;

/// Number of analog channels
pub const CHANNELS: usize = 4;

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Opcode {
    /// Raw sample, channel 0
    ReadA0 = 0x00,
    /// Averaged voltage, channel 0
    ReadV = 0x01,

    ReadA1 = 0x62,
    ReadV1 = 0x63,
    ReadA2 = 0x64,
    ReadV2 = 0x65,
    ReadA3 = 0x66,
    ReadV3 = 0x67,

    /// Indicator off
    Led0 = 0x10,
    /// Indicator on
    Led1 = 0x11,
    /// Invert indicator, replies with the new state
    LedToggle = 0x12,

    PinDischarge0 = 0x30,
    PinDischarge1 = 0x31,
    PinCharge0 = 0x40,
    PinCharge1 = 0x41,

    /// Both lines off
    ModeIdle = 0x50,
    /// Discharge off, then charge on
    ModeCharge = 0x51,
    /// Charge off, then discharge on
    ModeDischarge = 0x52,

    /// No-op, replies with a status byte
    Ping = 0xA0,
}

impl Opcode {
    pub const ALL: [Opcode; 19] = [
        Opcode::ReadA0,
        Opcode::ReadV,
        Opcode::ReadA1,
        Opcode::ReadV1,
        Opcode::ReadA2,
        Opcode::ReadV2,
        Opcode::ReadA3,
        Opcode::ReadV3,
        Opcode::Led0,
        Opcode::Led1,
        Opcode::LedToggle,
        Opcode::PinDischarge0,
        Opcode::PinDischarge1,
        Opcode::PinCharge0,
        Opcode::PinCharge1,
        Opcode::ModeIdle,
        Opcode::ModeCharge,
        Opcode::ModeDischarge,
        Opcode::Ping,
    ];

    /// Look up the opcode for a received byte
    pub fn from_byte(b: u8) -> Option<Opcode> {
        Self::ALL.iter().copied().find(|o| *o as u8 == b)
    }

    /// Resolve the action this opcode requests
    pub fn action(self) -> Action {
        use Opcode::*;

        match self {
            ReadA0 => Action::ReadRaw(Channel::A0),
            ReadV => Action::ReadVoltage(Channel::A0),
            ReadA1 => Action::ReadRaw(Channel::A1),
            ReadV1 => Action::ReadVoltage(Channel::A1),
            ReadA2 => Action::ReadRaw(Channel::A2),
            ReadV2 => Action::ReadVoltage(Channel::A2),
            ReadA3 => Action::ReadRaw(Channel::A3),
            ReadV3 => Action::ReadVoltage(Channel::A3),
            Led0 => Action::Led(false),
            Led1 => Action::Led(true),
            LedToggle => Action::LedToggle,
            PinDischarge0 => Action::Discharge(false),
            PinDischarge1 => Action::Discharge(true),
            PinCharge0 => Action::Charge(false),
            PinCharge1 => Action::Charge(true),
            ModeIdle => Action::Mode(Mode::Idle),
            ModeCharge => Action::Mode(Mode::Charge),
            ModeDischarge => Action::Mode(Mode::Discharge),
            Ping => Action::Ping,
        }
    }
}

/// Analog input channel
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Channel {
    A0 = 0,
    A1 = 1,
    A2 = 2,
    A3 = 3,
}

impl Channel {
    pub const ALL: [Channel; CHANNELS] = [Channel::A0, Channel::A1, Channel::A2, Channel::A3];

    /// Channel for an index in 0..=3
    pub fn from_index(v: u8) -> Option<Channel> {
        Channel::ALL.get(v as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl core::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: u8 = s.parse().map_err(|e| format!("invalid channel '{}': {}", s, e))?;
        Channel::from_index(v).ok_or_else(|| format!("channel {} out of range (0-3)", v))
    }
}

/// Named combination of charge and discharge line states
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Mode {
    Idle,
    Charge,
    Discharge,
}

impl core::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Mode::Idle),
            "charge" => Ok(Mode::Charge),
            "discharge" => Ok(Mode::Discharge),
            _ => Err(format!("unknown mode '{}'", s)),
        }
    }
}

/// Decoded request
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Action {
    ReadRaw(Channel),
    ReadVoltage(Channel),
    Led(bool),
    LedToggle,
    Discharge(bool),
    Charge(bool),
    Mode(Mode),
    Ping,
    /// Unrecognised byte, produces no side effect and no reply
    Unknown(u8),
}

impl From<u8> for Action {
    fn from(b: u8) -> Self {
        match Opcode::from_byte(b) {
            Some(o) => o.action(),
            None => Action::Unknown(b),
        }
    }
}

/// Payload emitted ahead of the terminator
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Response {
    /// Decimal ASCII text
    Uint(u32),
    /// Single raw byte, 0 or 1
    Bool(bool),
    /// Single raw zero byte
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_round_trip() {
        for o in Opcode::ALL.iter() {
            assert_eq!(Opcode::from_byte(*o as u8), Some(*o));
        }
    }

    #[test]
    fn decode_actions() {
        assert_eq!(Action::from(0x00), Action::ReadRaw(Channel::A0));
        assert_eq!(Action::from(0x01), Action::ReadVoltage(Channel::A0));
        assert_eq!(Action::from(0x66), Action::ReadRaw(Channel::A3));
        assert_eq!(Action::from(0x65), Action::ReadVoltage(Channel::A2));
        assert_eq!(Action::from(0x12), Action::LedToggle);
        assert_eq!(Action::from(0x31), Action::Discharge(true));
        assert_eq!(Action::from(0x40), Action::Charge(false));
        assert_eq!(Action::from(0x52), Action::Mode(Mode::Discharge));
        assert_eq!(Action::from(0xA0), Action::Ping);
    }

    #[test]
    fn unknown_bytes() {
        for b in [0x02u8, 0x13, 0x53, 0x61, 0x68, 0x99, 0xFF].iter() {
            assert_eq!(Action::from(*b), Action::Unknown(*b));
        }
    }

    #[test]
    fn channel_bounds() {
        assert_eq!(Channel::from_index(2), Some(Channel::A2));
        assert_eq!(Channel::from_index(4), None);

        assert_eq!("3".parse::<Channel>(), Ok(Channel::A3));
        assert!("4".parse::<Channel>().is_err());
        assert!("a".parse::<Channel>().is_err());
    }
}
