/// Mapping between the raw value of an enumerated register and its label.
#[derive(Debug)]
pub struct StateTable {
    pub name: &'static str,
    pub labels: &'static [&'static str],
    pub values: &'static [u16],
}

impl StateTable {
    /// `None` for every raw value that is not one of the known discriminants.
    pub fn label(&self, raw: i64) -> Option<&'static str> {
        let raw = u16::try_from(raw).ok()?;
        let index = self.values.iter().position(|v| *v == raw)?;
        self.labels.get(index).copied()
    }

    /// Accepts a label (case and `-`/`_` insensitive) or one of the known numeric values.
    pub fn parse(&self, text: &str) -> Option<u16> {
        let wanted = normalize(text);
        if let Some(index) = self.labels.iter().position(|l| normalize(l) == wanted) {
            return self.values.get(index).copied();
        }
        let raw = text.trim().parse::<u16>().ok()?;
        self.values.contains(&raw).then_some(raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &'static str)> + '_ {
        self.values.iter().copied().zip(self.labels.iter().copied())
    }
}

impl std::fmt::Display for StateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, (value, label)) in self.iter().enumerate() {
            if idx != 0 {
                f.write_str(", ")?;
            }
            f.write_fmt(format_args!("{value}={label}"))?;
        }
        Ok(())
    }
}

fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
        .collect()
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $value:literal),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            strum::VariantNames,
            strum::VariantArray,
            strum::FromRepr,
            strum::IntoStaticStr,
            strum::EnumString,
            strum::Display,
        )]
        #[strum(serialize_all = "kebab-case")]
        #[repr(u16)]
        $(#[$meta])*
        $vis enum $name {
            $($variant = $value),*
        }

        impl $name {
            pub const STATES: $crate::states::StateTable = $crate::states::StateTable {
                name: stringify!($name),
                labels: <Self as strum::VariantNames>::VARIANTS,
                values: &[$($value),*],
            };
        }

        impl TryFrom<$crate::registers::Value> for $name {
            type Error = $crate::registers::DecodeError;
            fn try_from(value: $crate::registers::Value) -> Result<Self, Self::Error> {
                u16::try_from(value.raw())
                    .ok()
                    .and_then(Self::from_repr)
                    .ok_or($crate::registers::DecodeError::UnknownState {
                        table: stringify!($name),
                        raw: value.raw(),
                    })
            }
        }

        impl $crate::properties::PropertyType for $name {
            fn decode(value: $crate::registers::Value) -> Result<Self, $crate::registers::DecodeError> {
                Self::try_from(value)
            }

            fn encode(
                self,
                data_type: $crate::registers::DataType,
            ) -> Result<$crate::registers::Value, $crate::registers::EncodeError> {
                data_type.value(i64::from(self as u16))
            }
        }
    };
}

string_enum! {
    pub enum OffOn {
        Off = 0,
        On = 1,
    }
}

string_enum! {
    /// Command registers: writing `start` triggers the action, the controller resets it to `idle`.
    pub enum Trigger {
        Idle = 0,
        Start = 1,
    }
}

string_enum! {
    pub enum HeatingCircuitState {
        Off = 0,
        Heating = 1,
        SetBack = 2,
        FrostProtection = 3,
        SummerShutdown = 4,
        Cooling = 5,
        Screed = 6,
        Fault = 7,
    }
}

string_enum! {
    pub enum HeatingCircuitMode {
        AlwaysOn = 0,
        TimeProgram = 1,
        SetBack = 2,
        Standby = 3,
        Eco = 4,
    }
}

string_enum! {
    pub enum MixerValve {
        Stopped = 0,
        Opening = 1,
        Closing = 2,
    }
}

string_enum! {
    pub enum BufferMode {
        Off = 0,
        Heating = 1,
        Cooling = 2,
    }
}

string_enum! {
    pub enum BoilerState {
        Off = 0,
        Charging = 1,
        Charged = 2,
        SingleCharge = 3,
        Legionella = 4,
    }
}

string_enum! {
    pub enum BoilerMode {
        AlwaysOn = 0,
        TimeProgram = 1,
        Off = 2,
    }
}

string_enum! {
    pub enum HeatPumpState {
        Off = 0,
        Heating = 1,
        DrinkingWater = 2,
        Cooling = 3,
        Defrost = 4,
        Standby = 5,
        UtilityLock = 6,
        Fault = 7,
    }
}

string_enum! {
    /// SG-Ready operating states. There is no state `0`.
    pub enum SmartGridMode {
        Lock = 1,
        Normal = 2,
        Recommended = 3,
        Forced = 4,
    }
}

string_enum! {
    pub enum BiomassBoilerStatus {
        Off = 0,
        Ready = 1,
        Ignition = 2,
        Heating = 3,
        Burnout = 4,
        Cleaning = 5,
        Fault = 6,
    }
}

string_enum! {
    pub enum DoorContact {
        Closed = 0,
        Open = 1,
    }
}

string_enum! {
    pub enum AshContainer {
        Ok = 0,
        Full = 1,
    }
}

string_enum! {
    pub enum SolarState {
        Off = 0,
        Charging = 1,
        OverheatProtection = 2,
        FrostProtection = 3,
    }
}

string_enum! {
    pub enum FreshWaterState {
        Off = 0,
        Standby = 1,
        Tapping = 2,
        Circulation = 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{DataType, DecodeError};

    #[test]
    fn labels_at_the_boundaries() {
        let table = &SmartGridMode::STATES;
        assert_eq!(table.label(0), None);
        assert_eq!(table.label(1), Some("lock"));
        assert_eq!(table.label(4), Some("forced"));
        assert_eq!(table.label(5), None);
        assert_eq!(table.label(-1), None);
        assert_eq!(table.label(i64::from(u16::MAX) + 1), None);
    }

    #[test]
    fn parse_accepts_labels_and_known_numbers() {
        let table = &HeatingCircuitMode::STATES;
        assert_eq!(table.parse("time-program"), Some(1));
        assert_eq!(table.parse("TIME_PROGRAM"), Some(1));
        assert_eq!(table.parse(" standby "), Some(3));
        assert_eq!(table.parse("4"), Some(4));
        assert_eq!(table.parse("5"), None);
        assert_eq!(table.parse("holiday"), None);
    }

    #[test]
    fn enum_from_value() {
        let value = DataType::U16.value(3).unwrap();
        assert_eq!(HeatPumpState::try_from(value).unwrap(), HeatPumpState::Cooling);
        let value = DataType::U16.value(8).unwrap();
        assert!(matches!(
            HeatPumpState::try_from(value),
            Err(DecodeError::UnknownState { table: "HeatPumpState", raw: 8 })
        ));
        let value = DataType::I16.value(-1).unwrap();
        assert!(OffOn::try_from(value).is_err());
    }

    #[test]
    fn labels_follow_declaration_order() {
        let table = &BoilerState::STATES;
        assert_eq!(table.labels.len(), table.values.len());
        assert_eq!(table.label(3), Some("single-charge"));
        assert_eq!(BoilerState::SingleCharge.to_string(), "single-charge");
        assert_eq!(table.to_string(), "0=off, 1=charging, 2=charged, 3=single-charge, 4=legionella");
    }
}
