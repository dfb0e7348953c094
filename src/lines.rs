//! Charge, discharge and indicator lines.
//!
//! [`LineDriver`] implementations work in physical levels. [`Lines`] is the
//! only place logical states are translated to levels: the charge line is
//! active low, the others are active high.

use core::marker::PhantomData;

use embedded_hal::digital::v2::{OutputPin, StatefulOutputPin};

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Line {
    Charge,
    Discharge,
    Indicator,
}

impl Line {
    /// Physical level for a logical state on this line (and vice versa)
    pub fn level(self, enabled: bool) -> bool {
        match self {
            Line::Charge => !enabled,
            Line::Discharge | Line::Indicator => enabled,
        }
    }
}

/// Physical line access
pub trait LineDriver<E> {
    fn set_level(&mut self, line: Line, high: bool) -> Result<(), E>;
    fn level(&mut self, line: Line) -> Result<bool, E>;
}

/// Logical line states
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PinState {
    pub charge: bool,
    pub discharge: bool,
    pub indicator: bool,
}

impl Default for PinState {
    /// Safe startup state, both power lines off with the indicator lit
    fn default() -> Self {
        Self {
            charge: false,
            discharge: false,
            indicator: true,
        }
    }
}

pub struct Lines<L, E> {
    driver: L,
    _err: PhantomData<E>,
}

impl<L, E> Lines<L, E>
where
    L: LineDriver<E>,
{
    pub fn new(driver: L) -> Self {
        Self {
            driver,
            _err: PhantomData,
        }
    }

    /// Enable or disable a line
    pub fn set(&mut self, line: Line, enabled: bool) -> Result<(), E> {
        debug!("Setting {:?} line {}", line, if enabled { "on" } else { "off" });
        self.driver.set_level(line, line.level(enabled))
    }

    /// Fetch whether a line is enabled
    pub fn get(&mut self, line: Line) -> Result<bool, E> {
        let high = self.driver.level(line)?;
        Ok(line.level(high))
    }

    /// Apply a complete state, power lines off before any goes on
    pub fn apply(&mut self, state: PinState) -> Result<(), E> {
        if !state.discharge {
            self.set(Line::Discharge, false)?;
        }
        if !state.charge {
            self.set(Line::Charge, false)?;
        }
        if state.discharge {
            self.set(Line::Discharge, true)?;
        }
        if state.charge {
            self.set(Line::Charge, true)?;
        }
        self.set(Line::Indicator, state.indicator)
    }

    /// Snapshot all line states
    pub fn state(&mut self) -> Result<PinState, E> {
        Ok(PinState {
            charge: self.get(Line::Charge)?,
            discharge: self.get(Line::Discharge)?,
            indicator: self.get(Line::Indicator)?,
        })
    }

    pub fn driver(&self) -> &L {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut L {
        &mut self.driver
    }
}

/// [`LineDriver`] over embedded-hal output pins
pub struct HalLines<C, D, I> {
    pub charge: C,
    pub discharge: D,
    pub indicator: I,
}

impl<C, D, I> HalLines<C, D, I> {
    pub fn new(charge: C, discharge: D, indicator: I) -> Self {
        Self {
            charge,
            discharge,
            indicator,
        }
    }
}

fn write_pin<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), P::Error> {
    if high {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

impl<C, D, I, E> LineDriver<E> for HalLines<C, D, I>
where
    C: OutputPin<Error = E> + StatefulOutputPin,
    D: OutputPin<Error = E> + StatefulOutputPin,
    I: OutputPin<Error = E> + StatefulOutputPin,
{
    fn set_level(&mut self, line: Line, high: bool) -> Result<(), E> {
        match line {
            Line::Charge => write_pin(&mut self.charge, high),
            Line::Discharge => write_pin(&mut self.discharge, high),
            Line::Indicator => write_pin(&mut self.indicator, high),
        }
    }

    fn level(&mut self, line: Line) -> Result<bool, E> {
        match line {
            Line::Charge => self.charge.is_set_high(),
            Line::Discharge => self.discharge.is_set_high(),
            Line::Indicator => self.indicator.is_set_high(),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::*;
    use crate::sim::SimLines;

    #[test]
    fn charge_line_is_inverted() {
        let mut lines: Lines<_, Infallible> = Lines::new(SimLines::default());

        lines.set(Line::Charge, true).unwrap();
        assert_eq!(lines.driver().level_of(Line::Charge), false);
        assert_eq!(lines.get(Line::Charge), Ok(true));

        lines.set(Line::Charge, false).unwrap();
        assert_eq!(lines.driver().level_of(Line::Charge), true);
        assert_eq!(lines.get(Line::Charge), Ok(false));
    }

    #[test]
    fn other_lines_are_direct() {
        let mut lines: Lines<_, Infallible> = Lines::new(SimLines::default());

        lines.set(Line::Discharge, true).unwrap();
        lines.set(Line::Indicator, true).unwrap();
        assert_eq!(lines.driver().level_of(Line::Discharge), true);
        assert_eq!(lines.driver().level_of(Line::Indicator), true);
    }

    #[derive(Default)]
    struct TestPin(bool);

    impl OutputPin for TestPin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0 = true;
            Ok(())
        }
    }

    impl StatefulOutputPin for TestPin {
        fn is_set_high(&self) -> Result<bool, Infallible> {
            Ok(self.0)
        }

        fn is_set_low(&self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    #[test]
    fn hal_pins() {
        let pins = HalLines::new(TestPin::default(), TestPin::default(), TestPin::default());
        let mut lines: Lines<_, Infallible> = Lines::new(pins);

        lines.apply(PinState::default()).unwrap();
        assert!(lines.driver().charge.0);
        assert!(!lines.driver().discharge.0);
        assert!(lines.driver().indicator.0);

        lines.set(Line::Charge, true).unwrap();
        assert!(!lines.driver().charge.0);
        assert_eq!(lines.get(Line::Charge), Ok(true));
    }

    #[test]
    fn apply_default_state() {
        let mut lines: Lines<_, Infallible> = Lines::new(SimLines::default());

        lines.apply(PinState::default()).unwrap();
        assert_eq!(lines.state(), Ok(PinState::default()));
        assert_eq!(
            lines.driver().history(),
            &[
                (Line::Discharge, false),
                (Line::Charge, true),
                (Line::Indicator, true)
            ]
        );
    }
}
