use crate::registers::{ApiVersion, DataType, Mode, RegisterKind, RegisterSpec, Unit};
use crate::states::*;

macro_rules! optional {
    () => {
        None
    };
    ($($lit: tt)+) => {
        Some($($lit)*)
    };
}

macro_rules! since {
    () => {
        ApiVersion::V21_140
    };
    ($version: ident) => {
        ApiVersion::$version
    };
}

macro_rules! register_table {
    ($(
        $kind: ident $offset: literal: $dt: ident, $mode: ident, $name: literal,
        $unit: ident $(($states: ident))?
        $(, min = $min: literal)? $(, max = $max: literal)? $(, since = $since: ident)?
        => $description: literal;
    )+) => {
        &[$(RegisterSpec {
            name: $name,
            kind: RegisterKind::$kind,
            offset: $offset,
            data_type: DataType::$dt,
            mode: Mode::$mode,
            unit: Unit::$unit $((&$states::STATES))?,
            minimum: optional!($($min)?),
            maximum: optional!($($max)?),
            since: since!($($since)?),
            description: $description,
        }),+]
    };
}

pub static HEATING_CIRCUIT: &[RegisterSpec] = register_table! {
    Input 0: CEL, R_, "SUPPLY_TEMPERATURE", Celsius
        => "Measured supply (flow) temperature of the circuit";
    Input 1: CEL, R_, "ROOM_TEMPERATURE", Celsius
        => "Room temperature reported by the room control unit";
    Input 2: DEC, R_, "HUMIDITY", Percent
        => "Relative humidity reported by the room control unit";
    Input 3: U16, R_, "LIMIT_THERMOSTAT", State(OffOn)
        => "Limit thermostat (underfloor heating protection) tripped";
    Input 4: U16, R_, "CIRCULATOR_PUMP", State(OffOn)
        => "Circulator pump running";
    Input 5: U16, R_, "MIXER_VALVE", State(MixerValve)
        => "Movement of the mixing valve";
    Input 6: U16, R_, "STATE", State(HeatingCircuitState)
        => "Current operating state of the circuit";
    Input 7: CEL, R_, "TARGET_SUPPLY_TEMPERATURE_CALCULATED", Celsius, since = V23_010
        => "Supply temperature setpoint calculated from the heating curve";
    Holding 0: CEL, RW, "TARGET_SUPPLY_TEMPERATURE", Celsius, min = 0, max = 900
        => "Supply temperature setpoint, used while the circuit runs in fixed-value mode";
    Holding 1: U16, RW, "COOLING", State(OffOn), since = V23_010
        => "Use the circuit for cooling instead of heating";
    Holding 2: U16, RW, "MODE", State(HeatingCircuitMode)
        => "Operating mode selection of the circuit";
    Holding 3: CEL, RW, "TARGET_ROOM_TEMPERATURE", Celsius, min = 50, max = 300
        => "Room temperature setpoint";
    Holding 4: CEL, RW, "INDOOR_TEMPERATURE_EXTERNAL", Celsius, min = -500, max = 800
        => "Room temperature supplied by an external sensor, replaces the room control unit";
    Holding 5: DEC, RW, "INDOOR_HUMIDITY_EXTERNAL", Percent, min = 0, max = 1000
        => "Relative humidity supplied by an external sensor";
};

pub static BUFFER: &[RegisterSpec] = register_table! {
    Input 0: CEL, R_, "TOP_TEMPERATURE", Celsius
        => "Temperature at the top of the buffer tank";
    Input 1: CEL, R_, "BOTTOM_TEMPERATURE", Celsius
        => "Temperature at the bottom of the buffer tank";
    Input 2: U16, R_, "PUMP", State(OffOn)
        => "Buffer charging pump running";
    Input 3: U16, R_, "MODE", State(BufferMode), since = V23_020
        => "Whether the buffer is kept warm or cold";
};

pub static BOILER: &[RegisterSpec] = register_table! {
    Input 0: CEL, R_, "TEMPERATURE", Celsius
        => "Domestic hot water temperature";
    Input 1: U16, R_, "STATE", State(BoilerState)
        => "Current charging state";
    Input 2: U16, R_, "MODE", State(BoilerMode)
        => "Operating mode currently in effect";
    Holding 0: CEL, RW, "TARGET_TEMPERATURE", Celsius, min = 200, max = 700
        => "Domestic hot water setpoint";
    Holding 1: U16, RW, "SINGLE_CHARGE", State(Trigger)
        => "Charge the boiler once to its setpoint, regardless of the time program";
    Holding 2: CEL, RW, "CIRCULATION_TEMPERATURE", Celsius, min = 200, max = 700
        => "Return temperature at which the circulation pump stops";
    Holding 3: U16, RW, "CIRCULATION_PUMP", State(OffOn)
        => "Circulation pump enabled";
    Holding 4: U16, RW, "CIRCULATION_MODE", State(BoilerMode), since = V23_010
        => "Operating mode of the circulation pump";
    Holding 5: U16, RW, "MODE_SELECTION", State(BoilerMode), since = V23_010
        => "Operating mode selection of the boiler";
};

pub static HEAT_PUMP: &[RegisterSpec] = register_table! {
    Input 0: CEL, R_, "SUPPLY_TEMPERATURE", Celsius
        => "Heat pump supply temperature";
    Input 1: CEL, R_, "RETURN_TEMPERATURE", Celsius
        => "Heat pump return temperature";
    Input 2: U16, R_, "FLOW_RATE", LitersPerHour
        => "Flow rate through the condenser";
    Input 3: DEC, R_, "COMPRESSOR_SPEED", Percent
        => "Compressor speed";
    Input 4: U16, R_, "EVU_LOCK_ACTIVE", State(OffOn)
        => "Utility company (EVU) lock is active";
    Input 5: U16, R_, "DEFROST_ACTIVE", State(OffOn)
        => "Evaporator defrost cycle running";
    Input 6: U16, R_, "REFRIGERANT_BOOSTER_ACTIVE", State(OffOn)
        => "Refrigerant booster heater running";
    Input 8: U32, R_, "THERMAL_ENERGY_TOTAL", KilowattHour
        => "Heat produced in total";
    Input 10: U32, R_, "THERMAL_ENERGY_DRINKING_WATER", KilowattHour
        => "Heat produced for domestic hot water";
    Input 12: U32, R_, "THERMAL_ENERGY_HEATING", KilowattHour
        => "Heat produced for space heating";
    Input 14: U32, R_, "ELECTRICAL_ENERGY_TOTAL", KilowattHour
        => "Electrical energy consumed in total";
    Input 16: U32, R_, "ELECTRICAL_ENERGY_DRINKING_WATER", KilowattHour
        => "Electrical energy consumed for domestic hot water";
    Input 18: U32, R_, "ELECTRICAL_ENERGY_HEATING", KilowattHour
        => "Electrical energy consumed for space heating";
    Input 20: U16, R_, "ELECTRICAL_POWER", Watt
        => "Current electrical power consumption";
    Input 21: U16, R_, "THERMAL_POWER_COOLING", Watt
        => "Current cooling power";
    Input 22: U16, R_, "THERMAL_POWER_HEATING", Watt
        => "Current heating power";
    Input 23: U32, R_, "THERMAL_ENERGY_COOLING", KilowattHour, since = V23_020
        => "Heat removed while cooling in total";
    Input 25: U32, R_, "ELECTRICAL_ENERGY_COOLING", KilowattHour, since = V23_020
        => "Electrical energy consumed for cooling";
    Input 27: U16, R_, "OPERATING_STATE", State(HeatPumpState)
        => "Current operating state of the heat pump";
    Input 28: CEL, R_, "EVAPORATOR_TEMPERATURE", Celsius, since = V23_040
        => "Evaporator (air inlet) temperature";
    Holding 0: U16, RW, "SMART_GRID", State(SmartGridMode), min = 1, max = 4
        => "SG-Ready request sent to the heat pump";
    Holding 1: CEL, RW, "OUTDOOR_TEMPERATURE_EXTERNAL", Celsius, min = -500, max = 500, since = V23_020
        => "Outdoor temperature supplied by an external sensor";
    Holding 2: U16, RW, "EVU_LOCK", State(OffOn), since = V23_020
        => "Request a utility company (EVU) lock";
};

pub static BIOMASS_BOILER: &[RegisterSpec] = register_table! {
    Input 0: CEL, R_, "TEMPERATURE", Celsius
        => "Boiler water temperature";
    Input 1: U16, R_, "STATUS", State(BiomassBoilerStatus)
        => "Current operating status of the boiler";
    Input 2: U16, R_, "MESSAGE_NUMBER", None
        => "Number of the message shown on the display, 0 when there is none";
    Input 3: U16, R_, "DOOR_CONTACT", State(DoorContact)
        => "Boiler door contact";
    Input 4: U16, R_, "CLEANING", State(OffOn)
        => "Heat exchanger cleaning running";
    Input 5: U16, R_, "ASH_CONTAINER", State(AshContainer)
        => "Ash container level";
    Input 6: CEL, R_, "OUTDOOR_TEMPERATURE", Celsius
        => "Outdoor temperature measured by the controller";
    Input 7: U16, R_, "OPERATION_MODE", None
        => "Operation mode code of the boiler";
    Input 8: CEL, R_, "OCTOPLUS_BUFFER_TOP_TEMPERATURE", Celsius, since = V23_020
        => "Temperature at the top of the integrated buffer (octoplus only)";
    Input 9: CEL, R_, "OCTOPLUS_BUFFER_BOTTOM_TEMPERATURE", Celsius, since = V23_020
        => "Temperature at the bottom of the integrated buffer (octoplus only)";
    Input 10: U16, R_, "LOG_WOOD", State(OffOn), since = V23_020
        => "Burning log wood instead of pellets";
    Input 12: DEC32, R_, "PELLET_USAGE_LAST_FILL", Kilogram
        => "Pellets burned since the last fill";
    Input 14: DEC32, R_, "PELLET_USAGE_TOTAL", Kilogram
        => "Pellets burned in total";
    Input 16: U32, R_, "FULL_LOAD_HOURS", Hours, since = V23_010
        => "Operating hours at full load";
    Holding 0: U16, RW, "PELLET_USAGE_RESET", State(Trigger)
        => "Reset the pellet usage counter of the last fill";
    Holding 1: U16, RW, "SWEEP_FUNCTION_START", State(Trigger)
        => "Start the chimney sweep function";
    Holding 2: U16, RW, "SWEEP_FUNCTION_EXTEND", State(Trigger)
        => "Extend a running chimney sweep function";
};

pub static SOLAR: &[RegisterSpec] = register_table! {
    Input 0: CEL, R_, "COLLECTOR_TEMPERATURE_1", Celsius
        => "Temperature of collector field 1";
    Input 1: CEL, R_, "COLLECTOR_TEMPERATURE_2", Celsius
        => "Temperature of collector field 2";
    Input 2: CEL, R_, "COLLECTOR_SUPPLY_TEMPERATURE", Celsius
        => "Solar circuit supply temperature";
    Input 3: CEL, R_, "COLLECTOR_RETURN_TEMPERATURE", Celsius
        => "Solar circuit return temperature";
    Input 4: U16, R_, "FLOW_HEAT_METER", LitersPerHour
        => "Flow measured by the heat meter";
    Input 5: DEC, R_, "CURRENT_POWER", Kilowatt
        => "Current solar power";
    Input 6: DEC, R_, "YIELD_TODAY", KilowattHour
        => "Solar yield of the current day";
    Input 7: U32, R_, "YIELD_TOTAL", KilowattHour
        => "Solar yield in total";
    Input 9: CEL, R_, "BUFFER_SENSOR_1", Celsius
        => "Solar reference sensor 1 in the buffer";
    Input 10: CEL, R_, "BUFFER_SENSOR_2", Celsius
        => "Solar reference sensor 2 in the buffer";
    Input 11: CEL, R_, "BUFFER_SENSOR_3", Celsius
        => "Solar reference sensor 3 in the buffer";
    Input 12: DEC, R_, "COLLECTOR_PUMP", Percent
        => "Collector pump speed";
    Input 13: U16, R_, "STATE", State(SolarState)
        => "Current operating state of the solar circuit";
};

pub static PHOTOVOLTAIC: &[RegisterSpec] = register_table! {
    Input 0: U32, R_, "PHOTOVOLTAIC_POWER", Watt, since = V22_090
        => "Power produced by the photovoltaic system";
    Input 2: U32, R_, "GRID_IMPORT", Watt, since = V22_090
        => "Power drawn from the grid";
    Input 4: U32, R_, "GRID_EXPORT", Watt, since = V22_090
        => "Power fed into the grid";
    Input 6: U32, R_, "HOUSE_CONSUMPTION", Watt, since = V22_090
        => "Power consumed by the household";
    Input 8: I32, R_, "SMART_METER_BALANCE", Watt, since = V23_040
        => "Net power at the smart meter, negative while exporting";
};

pub static FRESH_WATER_MODULE: &[RegisterSpec] = register_table! {
    Input 0: U16, R_, "STATE", State(FreshWaterState)
        => "Current operating state of the module";
    Input 1: CEL, R_, "SUPPLY_TEMPERATURE", Celsius
        => "Hot water supply temperature";
    Input 2: DEC, R_, "PUMP_SPEED", Percent
        => "Primary pump speed";
    Input 3: U16, R_, "VALVE", State(OffOn)
        => "Stratification valve open";
    Input 4: U16, R_, "FLOW_RATE", LitersPerHour, since = V23_010
        => "Hot water tapping flow rate";
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [(&str, &[RegisterSpec]); 8] = [
        ("heating circuit", HEATING_CIRCUIT),
        ("buffer", BUFFER),
        ("boiler", BOILER),
        ("heat pump", HEAT_PUMP),
        ("biomass boiler", BIOMASS_BOILER),
        ("solar", SOLAR),
        ("photovoltaic", PHOTOVOLTAIC),
        ("fresh water module", FRESH_WATER_MODULE),
    ];

    #[test]
    fn offsets_are_sorted_and_do_not_overlap() {
        for (table_name, table) in ALL {
            for kind in [RegisterKind::Input, RegisterKind::Holding] {
                let mut end = 0;
                for register in table.iter().filter(|r| r.kind == kind) {
                    assert!(register.offset >= end, "{table_name}: {} overlaps", register.name);
                    end = register.end_offset();
                }
            }
        }
    }

    #[test]
    fn names_are_unique() {
        for (table_name, table) in ALL {
            for (idx, register) in table.iter().enumerate() {
                let duplicate = table[idx + 1..].iter().any(|r| r.name == register.name);
                assert!(!duplicate, "{table_name}: {} is duplicated", register.name);
            }
        }
    }

    #[test]
    fn input_registers_are_read_only() {
        for (table_name, table) in ALL {
            for register in table.iter().filter(|r| r.kind == RegisterKind::Input) {
                assert!(!register.mode.is_writable(), "{table_name}: {}", register.name);
            }
        }
    }

    #[test]
    fn bounds_fit_the_data_type() {
        for (table_name, table) in ALL {
            for register in table {
                let (min, max) = register.data_type.raw_range();
                for bound in [register.minimum, register.maximum].into_iter().flatten() {
                    assert!(bound >= min && bound <= max, "{table_name}: {}", register.name);
                }
                if let (Some(lo), Some(hi)) = (register.minimum, register.maximum) {
                    assert!(lo <= hi, "{table_name}: {}", register.name);
                }
            }
        }
    }

    #[test]
    fn state_registers_are_single_unsigned_words() {
        for (table_name, table) in ALL {
            for register in table.iter().filter(|r| r.unit.states().is_some()) {
                assert_eq!(register.data_type, DataType::U16, "{table_name}: {}", register.name);
            }
        }
    }
}
