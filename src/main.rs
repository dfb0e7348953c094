#[macro_use]
extern crate log;

extern crate structopt;
use structopt::StructOpt;

extern crate simplelog;
use simplelog::{Config, LevelFilter, SimpleLogger};

use std::time::Duration;

use indicatif::ProgressBar;

use cell_link::protocol::CHANNELS;
use cell_link::{averager, Channel, Client, Controller, Mode, Options};

#[derive(Clone, Debug, StructOpt)]
pub struct Args {
    /// Serial port to connect to
    #[structopt(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Serial port baud rate
    #[structopt(long, default_value = "9600")]
    baud: usize,

    #[structopt(flatten)]
    options: Options,

    #[structopt(subcommand)]
    command: Command,

    /// Log level for console output
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

impl std::str::FromStr for Switch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" | "1" => Ok(Switch::On),
            "off" | "0" => Ok(Switch::Off),
            "toggle" => Ok(Switch::Toggle),
            _ => Err(format!("expected on, off or toggle, found '{}'", s)),
        }
    }
}

#[derive(Clone, Debug, StructOpt)]
pub enum Command {
    /// Check the controller is responding
    Ping,

    /// Read an unfiltered ADC sample
    ReadRaw {
        #[structopt(default_value = "0")]
        channel: Channel,
    },

    /// Read the averaged voltage in millivolts
    ReadVoltage {
        #[structopt(default_value = "0")]
        channel: Channel,
    },

    /// Set the indicator (on, off or toggle)
    Led { state: Switch },

    /// Set the charge line (on or off)
    Charge { state: Switch },

    /// Set the discharge line (on or off)
    Discharge { state: Switch },

    /// Select idle, charge or discharge mode
    Mode { mode: Mode },

    /// Send a raw opcode and print the response
    Send {
        #[structopt(parse(try_from_str = parse_byte))]
        opcode: u8,
    },

    /// Periodically read the averaged voltage
    Monitor {
        #[structopt(default_value = "0")]
        channel: Channel,

        /// Period between reads
        #[structopt(long, default_value = "1000")]
        period_ms: u64,
    },

    /// Run a simulated controller on the serial port
    Serve {
        #[structopt(flatten)]
        config: averager::Config,

        /// Raw sample reported for each channel
        #[structopt(long, default_value = "512,512,512,512", use_delimiter = true)]
        raw: Vec<u16>,
    },
}

fn parse_byte(s: &str) -> Result<u8, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(h) => u8::from_str_radix(h, 16),
        None => s.parse(),
    }
}

fn switch(s: &Switch) -> anyhow::Result<bool> {
    match s {
        Switch::On => Ok(true),
        Switch::Off => Ok(false),
        Switch::Toggle => Err(anyhow::anyhow!("toggle is only supported for the indicator")),
    }
}

fn serve(o: &Args, config: &averager::Config, raw: &[u16]) -> anyhow::Result<()> {
    if raw.len() != CHANNELS {
        return Err(anyhow::anyhow!("expected {} raw values, found {}", CHANNELS, raw.len()));
    }
    let mut r = [0u16; CHANNELS];
    r.copy_from_slice(raw);

    let mut c = Controller::linux_sim(&o.port, o.baud, r, config.clone())?;

    info!("Simulated controller running on {}", o.port);
    c.run()
}

fn run(o: &Args) -> anyhow::Result<()> {
    if let Command::Serve { config, raw } = &o.command {
        return serve(o, config, raw);
    }

    info!("Connecting to serial port");

    let mut c = Client::linux(&o.port, o.baud, o.options.clone())?;

    c.init()?;

    info!("Controller connected!");

    match &o.command {
        Command::Ping => info!("Pong"),
        Command::ReadRaw { channel } => {
            let v = c.read_raw(*channel)?;
            info!("Channel {:?} raw: {}", channel, v);
        }
        Command::ReadVoltage { channel } => {
            let v = c.read_voltage(*channel)?;
            info!("Channel {:?} voltage: {} mV", channel, v);
        }
        Command::Led { state: Switch::Toggle } => {
            let on = c.toggle_led()?;
            info!("Indicator {}", if on { "on" } else { "off" });
        }
        Command::Led { state } => c.set_led(switch(state)?)?,
        Command::Charge { state } => c.set_charge(switch(state)?)?,
        Command::Discharge { state } => c.set_discharge(switch(state)?)?,
        Command::Mode { mode } => c.set_mode(*mode)?,
        Command::Send { opcode } => {
            let d = c.transact(*opcode)?;
            info!("Response: [{}]", hex::encode(&d));
        }
        Command::Monitor { channel, period_ms } => {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(100);

            loop {
                let v = c.read_voltage(*channel)?;
                pb.set_message(&format!("Channel {:?}: {} mV", channel, v));
                std::thread::sleep(Duration::from_millis(*period_ms));
            }
        }
        Command::Serve { .. } => unreachable!(),
    }

    Ok(())
}

fn main() {
    // Parse out arguments
    let o = Args::from_args();

    // Configure logger
    let _ = SimpleLogger::init(o.log_level, Config::default());

    if let Err(e) = run(&o) {
        error!("{:?}", e);
        std::process::exit(1);
    }
}
