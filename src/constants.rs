//! Symbolic constant tables for opcode arguments.
//!
//! Each table maps a raw integer argument value to the symbolic name a GBC
//! script author would have written (button identifiers, LED indices, truth
//! values, console/IO routes, rumble motors, sensitivity curves, PS4
//! touchpad zones, persistent-variable slots). The decompiler renders a raw
//! constant through the owning opcode's table instead of printing the bare
//! number, and [`crate::decoder::Decoder::infer_variables`] propagates the
//! same table onto variable loads once a store has told it what a slot
//! holds.

/// A constant table: raw value → symbolic name, searched linearly.
///
/// These tables top out at a few dozen rows, so a linear scan over a static
/// slice is simpler and just as fast as building a hash map at startup.
pub struct ConstTable(pub &'static [(i64, &'static str)]);

impl ConstTable {
    /// Looks up `value`, falling back to its decimal rendering when absent.
    pub fn render(&self, value: i64) -> String {
        match self.lookup(value) {
            Some(name) => name.to_string(),
            None => value.to_string(),
        }
    }

    pub fn lookup(&self, value: i64) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, name)| *name)
    }
}

pub static BUTTONS: ConstTable = ConstTable(&[
    (0, "PS4_UP"),
    (1, "PS4_DOWN"),
    (2, "PS4_LEFT"),
    (3, "PS4_RIGHT"),
    (4, "PS4_L1"),
    (5, "PS4_R1"),
    (6, "PS4_L2"),
    (7, "PS4_R2"),
    (8, "PS4_L3"),
    (9, "PS4_R3"),
    (10, "PS4_SHARE"),
    (11, "PS4_OPTIONS"),
    (12, "PS4_TOUCH"),
    (13, "PS4_PS"),
    (14, "PS4_TRIANGLE"),
    (15, "PS4_CIRCLE"),
    (16, "PS4_CROSS"),
    (17, "PS4_SQUARE"),
    (18, "PS4_LX"),
    (19, "PS4_LY"),
    (20, "PS4_RX"),
    (21, "PS4_RY"),
]);

pub static LEDS: ConstTable = ConstTable(&[
    (0, "LED_1"),
    (1, "LED_2"),
    (2, "LED_3"),
    (3, "LED_4"),
    (4, "LED_RUMBLE_A"),
    (5, "LED_RUMBLE_B"),
]);

pub static TRUTHS: ConstTable = ConstTable(&[(0, "FALSE"), (1, "TRUE")]);

pub static PIO: ConstTable = ConstTable(&[
    (0, "PIO_PS3"),
    (1, "PIO_PS4"),
    (2, "PIO_XB1"),
    (3, "PIO_XB360"),
    (4, "PIO_SWITCH"),
    (5, "PIO_PC"),
]);

pub static RUMBLE: ConstTable = ConstTable(&[
    (0, "RUMBLE_A"),
    (1, "RUMBLE_B"),
    (2, "RUMBLE_C"),
    (3, "RUMBLE_D"),
]);

pub static SENS: ConstTable = ConstTable(&[
    (0, "SENSITIVITY_LOW"),
    (1, "SENSITIVITY_MEDIUM"),
    (2, "SENSITIVITY_HIGH"),
    (3, "SENSITIVITY_EXTRA"),
]);

pub static PS4: ConstTable = ConstTable(&[
    (0, "PS4_TOUCHPAD_X1"),
    (1, "PS4_TOUCHPAD_Y1"),
    (2, "PS4_TOUCHPAD_X2"),
    (3, "PS4_TOUCHPAD_Y2"),
    (4, "PS4_TOUCHPAD_TOUCH1"),
    (5, "PS4_TOUCHPAD_TOUCH2"),
]);

pub static PVARS: ConstTable = ConstTable(&[
    (0, "PVAR_1"),
    (1, "PVAR_2"),
    (2, "PVAR_3"),
    (3, "PVAR_4"),
    (4, "PVAR_5"),
    (5, "PVAR_6"),
    (6, "PVAR_7"),
    (7, "PVAR_8"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_value_renders_symbolic_name() {
        assert_eq!(BUTTONS.render(16), "PS4_CROSS");
    }

    #[test]
    fn unknown_value_falls_back_to_decimal() {
        assert_eq!(BUTTONS.render(999), "999");
    }

    #[test]
    fn truths_cover_zero_and_one() {
        assert_eq!(TRUTHS.render(0), "FALSE");
        assert_eq!(TRUTHS.render(1), "TRUE");
    }
}
