//! Typed handles for the registers of each component.
//!
//! A [`Property`] ties a register name to the Rust type its value is exposed as, so that
//! `snapshot.get(heat_pump::SUPPLY_TEMPERATURE)` yields an `f64` in °C while
//! `snapshot.get(heat_pump::OPERATING_STATE)` yields a [`HeatPumpState`](crate::states::HeatPumpState).

use std::marker::PhantomData;

use crate::components::ComponentKind;
use crate::registers::{DataType, DecodeError, EncodeError, Value};

pub trait PropertyType: Sized {
    fn decode(value: Value) -> Result<Self, DecodeError>;
    fn encode(self, data_type: DataType) -> Result<Value, EncodeError>;
}

/// Measurements and setpoints, in physical units.
impl PropertyType for f64 {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        Ok(value.scaled())
    }

    fn encode(self, data_type: DataType) -> Result<Value, EncodeError> {
        data_type.from_scaled(self)
    }
}

/// Counters.
impl PropertyType for u32 {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        u32::try_from(value.raw()).map_err(|_| DecodeError::Overflow { raw: value.raw() })
    }

    fn encode(self, data_type: DataType) -> Result<Value, EncodeError> {
        data_type.value(i64::from(self))
    }
}

impl PropertyType for i32 {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        i32::try_from(value.raw()).map_err(|_| DecodeError::Overflow { raw: value.raw() })
    }

    fn encode(self, data_type: DataType) -> Result<Value, EncodeError> {
        data_type.value(i64::from(self))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Property<T> {
    component: ComponentKind,
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    pub const fn new(component: ComponentKind, name: &'static str) -> Self {
        Self { component, name, _type: PhantomData }
    }

    pub const fn component(&self) -> ComponentKind {
        self.component
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

macro_rules! properties {
    ($kind: ident { $($name: ident: $ty: ty,)* }) => {
        use super::*;
        $(pub const $name: Property<$ty> = Property::new(ComponentKind::$kind, stringify!($name));)*

        #[cfg(test)]
        pub(crate) const ALL: &[(ComponentKind, &str)] = &[
            $((ComponentKind::$kind, stringify!($name)),)*
        ];
    };
}

pub mod heating_circuit {
    use crate::states::{HeatingCircuitMode, HeatingCircuitState, MixerValve, OffOn};
    properties!(HeatingCircuit {
        SUPPLY_TEMPERATURE: f64,
        ROOM_TEMPERATURE: f64,
        HUMIDITY: f64,
        LIMIT_THERMOSTAT: OffOn,
        CIRCULATOR_PUMP: OffOn,
        MIXER_VALVE: MixerValve,
        STATE: HeatingCircuitState,
        TARGET_SUPPLY_TEMPERATURE_CALCULATED: f64,
        TARGET_SUPPLY_TEMPERATURE: f64,
        COOLING: OffOn,
        MODE: HeatingCircuitMode,
        TARGET_ROOM_TEMPERATURE: f64,
        INDOOR_TEMPERATURE_EXTERNAL: f64,
        INDOOR_HUMIDITY_EXTERNAL: f64,
    });
}

pub mod buffer {
    use crate::states::{BufferMode, OffOn};
    properties!(Buffer {
        TOP_TEMPERATURE: f64,
        BOTTOM_TEMPERATURE: f64,
        PUMP: OffOn,
        MODE: BufferMode,
    });
}

pub mod boiler {
    use crate::states::{BoilerMode, BoilerState, OffOn, Trigger};
    properties!(Boiler {
        TEMPERATURE: f64,
        STATE: BoilerState,
        MODE: BoilerMode,
        TARGET_TEMPERATURE: f64,
        SINGLE_CHARGE: Trigger,
        CIRCULATION_TEMPERATURE: f64,
        CIRCULATION_PUMP: OffOn,
        CIRCULATION_MODE: BoilerMode,
        MODE_SELECTION: BoilerMode,
    });
}

pub mod heat_pump {
    use crate::states::{HeatPumpState, OffOn, SmartGridMode};
    properties!(HeatPump {
        SUPPLY_TEMPERATURE: f64,
        RETURN_TEMPERATURE: f64,
        FLOW_RATE: f64,
        COMPRESSOR_SPEED: f64,
        EVU_LOCK_ACTIVE: OffOn,
        DEFROST_ACTIVE: OffOn,
        REFRIGERANT_BOOSTER_ACTIVE: OffOn,
        THERMAL_ENERGY_TOTAL: u32,
        THERMAL_ENERGY_DRINKING_WATER: u32,
        THERMAL_ENERGY_HEATING: u32,
        ELECTRICAL_ENERGY_TOTAL: u32,
        ELECTRICAL_ENERGY_DRINKING_WATER: u32,
        ELECTRICAL_ENERGY_HEATING: u32,
        ELECTRICAL_POWER: f64,
        THERMAL_POWER_COOLING: f64,
        THERMAL_POWER_HEATING: f64,
        THERMAL_ENERGY_COOLING: u32,
        ELECTRICAL_ENERGY_COOLING: u32,
        OPERATING_STATE: HeatPumpState,
        EVAPORATOR_TEMPERATURE: f64,
        SMART_GRID: SmartGridMode,
        OUTDOOR_TEMPERATURE_EXTERNAL: f64,
        EVU_LOCK: OffOn,
    });
}

pub mod biomass_boiler {
    use crate::states::{AshContainer, BiomassBoilerStatus, DoorContact, OffOn, Trigger};
    properties!(BiomassBoiler {
        TEMPERATURE: f64,
        STATUS: BiomassBoilerStatus,
        MESSAGE_NUMBER: u32,
        DOOR_CONTACT: DoorContact,
        CLEANING: OffOn,
        ASH_CONTAINER: AshContainer,
        OUTDOOR_TEMPERATURE: f64,
        OPERATION_MODE: u32,
        OCTOPLUS_BUFFER_TOP_TEMPERATURE: f64,
        OCTOPLUS_BUFFER_BOTTOM_TEMPERATURE: f64,
        LOG_WOOD: OffOn,
        PELLET_USAGE_LAST_FILL: f64,
        PELLET_USAGE_TOTAL: f64,
        FULL_LOAD_HOURS: u32,
        PELLET_USAGE_RESET: Trigger,
        SWEEP_FUNCTION_START: Trigger,
        SWEEP_FUNCTION_EXTEND: Trigger,
    });
}

pub mod solar {
    use crate::states::SolarState;
    properties!(Solar {
        COLLECTOR_TEMPERATURE_1: f64,
        COLLECTOR_TEMPERATURE_2: f64,
        COLLECTOR_SUPPLY_TEMPERATURE: f64,
        COLLECTOR_RETURN_TEMPERATURE: f64,
        FLOW_HEAT_METER: f64,
        CURRENT_POWER: f64,
        YIELD_TODAY: f64,
        YIELD_TOTAL: u32,
        BUFFER_SENSOR_1: f64,
        BUFFER_SENSOR_2: f64,
        BUFFER_SENSOR_3: f64,
        COLLECTOR_PUMP: f64,
        STATE: SolarState,
    });
}

pub mod photovoltaic {
    properties!(Photovoltaic {
        PHOTOVOLTAIC_POWER: u32,
        GRID_IMPORT: u32,
        GRID_EXPORT: u32,
        HOUSE_CONSUMPTION: u32,
        SMART_METER_BALANCE: i32,
    });
}

pub mod fresh_water_module {
    use crate::states::{FreshWaterState, OffOn};
    properties!(FreshWaterModule {
        STATE: FreshWaterState,
        SUPPLY_TEMPERATURE: f64,
        PUMP_SPEED: f64,
        VALVE: OffOn,
        FLOW_RATE: f64,
    });
}
