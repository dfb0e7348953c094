use std::io::ErrorKind;

use embedded_hal_mock::delay::MockNoop;
use embedded_hal_mock::serial::{Mock, Transaction};
use embedded_hal_mock::MockError;

use cell_link::averager::Config;
use cell_link::protocol::TERMINATOR;
use cell_link::sim::SimLines;
use cell_link::{Action, Channel, Controller, Error, Line, LineDriver, PinState, SampleSource};

#[derive(Clone, Debug, PartialEq)]
struct Fault;

/// Samples that fail on request
#[derive(Default)]
struct FlakySource {
    fail: bool,
}

impl SampleSource<Fault> for FlakySource {
    fn sample(&mut self, _channel: Channel) -> Result<u16, Fault> {
        if self.fail {
            Err(Fault)
        } else {
            Ok(512)
        }
    }
}

/// Lines that fail on request
#[derive(Default)]
struct FlakyLines {
    lines: SimLines,
    fail: bool,
}

impl LineDriver<Fault> for FlakyLines {
    fn set_level(&mut self, line: Line, high: bool) -> Result<(), Fault> {
        if self.fail {
            return Err(Fault);
        }
        LineDriver::<Fault>::set_level(&mut self.lines, line, high)
    }

    fn level(&mut self, line: Line) -> Result<bool, Fault> {
        if self.fail {
            return Err(Fault);
        }
        LineDriver::<Fault>::level(&mut self.lines, line)
    }
}

type FlakyController = Controller<Mock<u8>, FlakyLines, FlakySource, MockNoop, Fault>;

fn controller(t: &[Transaction<u8>]) -> FlakyController {
    Controller::new(
        Mock::new(t),
        FlakyLines::default(),
        FlakySource::default(),
        MockNoop::new(),
        Config::default(),
    )
    .unwrap()
}

fn broken() -> nb::Error<MockError> {
    nb::Error::Other(MockError::Io(ErrorKind::BrokenPipe))
}

#[test]
fn failed_sample_sends_nothing() {
    // Only the opcodes are read, no write is expected
    let mut c = controller(&[
        Transaction::read(0x00),
        Transaction::read(0x65),
        Transaction::read(0xA0),
        Transaction::write_many([0x00, TERMINATOR]),
        Transaction::flush(),
    ]);
    c.averager().source().fail = true;

    assert_eq!(c.poll(), Err(Error::Hardware(Fault)));
    assert_eq!(c.poll(), Err(Error::Hardware(Fault)));
    assert_eq!(c.averager().samples_taken(Channel::A2), 0);

    // The dispatcher keeps serving afterwards
    assert_eq!(c.poll(), Ok(Some(Action::Ping)));
    c.port().done();
}

#[test]
fn failed_line_sends_nothing() {
    let mut c = controller(&[Transaction::read(0x12), Transaction::read(0x51)]);
    c.lines_mut().fail = true;

    assert_eq!(c.poll(), Err(Error::Hardware(Fault)));
    assert_eq!(c.poll(), Err(Error::Hardware(Fault)));
    c.port().done();

    c.lines_mut().fail = false;
    assert_eq!(c.pin_state(), Ok(PinState::default()));
}

#[test]
fn failed_startup_is_reported() {
    let lines = FlakyLines {
        fail: true,
        ..FlakyLines::default()
    };
    let r = Controller::new(
        Mock::<u8>::new(&[]),
        lines,
        FlakySource::default(),
        MockNoop::new(),
        Config::default(),
    );

    assert!(matches!(r, Err(Error::Hardware(Fault))));
}

#[test]
fn read_error_is_no_byte() {
    let mut c = controller(&[
        Transaction::read_error(broken()),
        Transaction::read_error(nb::Error::WouldBlock),
        Transaction::read(0xA0),
        Transaction::write_many([0x00, TERMINATOR]),
        Transaction::flush(),
    ]);

    assert_eq!(c.poll(), Ok(None));
    assert_eq!(c.poll(), Ok(None));
    assert_eq!(c.poll(), Ok(Some(Action::Ping)));
    c.port().done();
}

#[test]
fn write_error_drops_rest_of_response() {
    // "512" fails on the second digit: no further digits, terminator or flush
    let mut c = controller(&[
        Transaction::read(0x00),
        Transaction::write(b'5'),
        Transaction::write_error(b'1', broken()),
    ]);

    assert_eq!(c.poll(), Ok(Some(Action::ReadRaw(Channel::A0))));
    c.port().done();
}
