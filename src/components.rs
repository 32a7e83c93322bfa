use crate::properties::{Property, PropertyType};
use crate::register_map;
use crate::registers::{ApiVersion, DecodeError, RegisterKind, RegisterSpec, Value};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("`{0}` is not a known component (e.g. `heating-circuit-1`, `heat-pump`)")]
    UnknownComponent(String),
    #[error("{kind} supports at most {maximum} instances, {requested} requested")]
    TooMany { kind: ComponentKind, requested: u8, maximum: u8 },
    #[error("{0} is not part of the configured system")]
    NotConfigured(Component),
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantArray,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ComponentKind {
    HeatingCircuit,
    Buffer,
    Boiler,
    HeatPump,
    BiomassBoiler,
    Solar,
    Photovoltaic,
    FreshWaterModule,
}

/// Address distance between two instances of the same component kind.
const INSTANCE_STRIDE: u16 = 50;

impl ComponentKind {
    pub fn registers(self) -> &'static [RegisterSpec] {
        match self {
            ComponentKind::HeatingCircuit => register_map::HEATING_CIRCUIT,
            ComponentKind::Buffer => register_map::BUFFER,
            ComponentKind::Boiler => register_map::BOILER,
            ComponentKind::HeatPump => register_map::HEAT_PUMP,
            ComponentKind::BiomassBoiler => register_map::BIOMASS_BOILER,
            ComponentKind::Solar => register_map::SOLAR,
            ComponentKind::Photovoltaic => register_map::PHOTOVOLTAIC,
            ComponentKind::FreshWaterModule => register_map::FRESH_WATER_MODULE,
        }
    }

    /// Base addresses of the first instance.
    fn bases(self) -> (u16, Option<u16>) {
        match self {
            ComponentKind::HeatingCircuit => (1100, Some(32600)),
            ComponentKind::Buffer => (1900, None),
            ComponentKind::Boiler => (500, Some(32000)),
            ComponentKind::HeatPump => (2300, Some(33404)),
            ComponentKind::BiomassBoiler => (2400, Some(33400)),
            ComponentKind::Solar => (2100, None),
            ComponentKind::Photovoltaic => (2500, None),
            ComponentKind::FreshWaterModule => (2700, None),
        }
    }

    pub fn max_instances(self) -> u8 {
        match self {
            ComponentKind::HeatingCircuit => 8,
            ComponentKind::Buffer | ComponentKind::Boiler | ComponentKind::FreshWaterModule => 4,
            _ => 1,
        }
    }

    pub fn register(self, name: &str) -> Option<&'static RegisterSpec> {
        let wanted = name.trim().replace('-', "_").to_uppercase();
        self.registers().iter().find(|r| r.name == wanted)
    }
}

/// A single instance of a component, e.g. the second heating circuit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Component {
    pub kind: ComponentKind,
    /// Zero-based.
    pub index: u8,
}

impl Component {
    pub const fn new(kind: ComponentKind, index: u8) -> Self {
        Self { kind, index }
    }

    /// `heating-circuit-2`, or just `heat-pump` for kinds with a single instance.
    pub fn id(&self) -> String {
        self.to_string()
    }

    pub fn base(&self, register_kind: RegisterKind) -> Option<u16> {
        let (input, holding) = self.kind.bases();
        let offset = INSTANCE_STRIDE * u16::from(self.index);
        match register_kind {
            RegisterKind::Input => Some(input + offset),
            RegisterKind::Holding => holding.map(|h| h + offset),
        }
    }

    /// Registers that exist on a controller running `version`.
    pub fn registers(
        &self,
        version: ApiVersion,
    ) -> impl Iterator<Item = &'static RegisterSpec> + 'static {
        self.kind.registers().iter().filter(move |r| r.is_available(version))
    }

    pub fn address_of(&self, register: &RegisterSpec) -> Option<u16> {
        Some(self.base(register.kind)? + register.offset)
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind.max_instances() == 1 {
            f.write_fmt(format_args!("{}", self.kind))
        } else {
            f.write_fmt(format_args!("{}-{}", self.kind, u16::from(self.index) + 1))
        }
    }
}

impl std::str::FromStr for Component {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || Error::UnknownComponent(s.to_string());
        let normalized = s.trim().replace('_', "-").to_lowercase();
        if let Ok(kind) = normalized.parse::<ComponentKind>() {
            return Ok(Self::new(kind, 0));
        }
        let (kind, number) = normalized.rsplit_once('-').ok_or_else(unknown)?;
        let kind = kind.parse::<ComponentKind>().map_err(|_| unknown())?;
        let number = number.parse::<u8>().map_err(|_| unknown())?;
        if number == 0 || number > kind.max_instances() {
            return Err(unknown());
        }
        Ok(Self::new(kind, number - 1))
    }
}

impl serde::Serialize for Component {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemType {
    /// Air source heat pump.
    Vampair,
    /// Pellet boiler.
    Therminator,
    /// Pellet boiler.
    Ecotop,
    /// Combined log wood and pellet boiler.
    Octoplus,
}

impl SystemType {
    pub fn heat_source(self) -> ComponentKind {
        match self {
            SystemType::Vampair => ComponentKind::HeatPump,
            _ => ComponentKind::BiomassBoiler,
        }
    }
}

/// The components a particular installation has.
#[derive(clap::Parser, Clone, Debug)]
#[group(id = "components::Layout")]
pub struct Layout {
    /// The kind of heat source the controller manages.
    #[arg(long, value_enum, default_value_t = SystemType::Vampair)]
    pub system: SystemType,

    /// The Modbus API version of the controller firmware.
    ///
    /// Registers introduced in later versions are skipped.
    #[arg(long, default_value_t = ApiVersion::LATEST)]
    pub api_version: ApiVersion,

    #[arg(long, default_value = "1")]
    pub heating_circuits: u8,

    #[arg(long, default_value = "1")]
    pub boilers: u8,

    #[arg(long, default_value = "1")]
    pub buffers: u8,

    #[arg(long, default_value = "0")]
    pub fresh_water_modules: u8,

    /// The system has a solar thermal circuit.
    #[arg(long)]
    pub solar: bool,

    /// The system has a photovoltaic / smart meter integration.
    #[arg(long)]
    pub photovoltaic: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            system: SystemType::Vampair,
            api_version: ApiVersion::LATEST,
            heating_circuits: 1,
            boilers: 1,
            buffers: 1,
            fresh_water_modules: 0,
            solar: false,
            photovoltaic: false,
        }
    }
}

impl Layout {
    pub fn components(&self) -> Result<Vec<Component>, Error> {
        let mut result = Vec::new();
        let counts = [
            (ComponentKind::HeatingCircuit, self.heating_circuits),
            (ComponentKind::Buffer, self.buffers),
            (ComponentKind::Boiler, self.boilers),
            (self.system.heat_source(), 1),
            (ComponentKind::Solar, u8::from(self.solar)),
            (ComponentKind::Photovoltaic, u8::from(self.photovoltaic)),
            (ComponentKind::FreshWaterModule, self.fresh_water_modules),
        ];
        for (kind, requested) in counts {
            let maximum = kind.max_instances();
            if requested > maximum {
                return Err(Error::TooMany { kind, requested, maximum });
            }
            result.extend((0..requested).map(|index| Component::new(kind, index)));
        }
        result.sort();
        Ok(result)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Reading {
    pub register: &'static RegisterSpec,
    pub value: Value,
}

/// The decoded state of one component at the time it was read.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub component: Component,
    pub readings: Vec<Reading>,
}

impl Snapshot {
    pub fn value(&self, name: &str) -> Option<Value> {
        let register = self.component.kind.register(name)?;
        self.readings
            .iter()
            .find(|r| std::ptr::eq(r.register, register))
            .map(|r| r.value)
    }

    pub fn get<T: PropertyType>(&self, property: Property<T>) -> Result<T, DecodeError> {
        if property.component() != self.component.kind {
            return Err(DecodeError::WrongComponent {
                register: property.name(),
                component: self.component.kind,
            });
        }
        let value = self.value(property.name()).ok_or(DecodeError::Missing(property.name()))?;
        T::decode(value)
    }

    /// Values calculated from the registers of this component.
    pub fn derived(&self) -> Vec<Derived> {
        DERIVED
            .iter()
            .filter(|d| d.component == self.component.kind)
            .map(|d| Derived { name: d.name, value: d.calculate(self) })
            .collect()
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.component)?;
        for kind in [RegisterKind::Input, RegisterKind::Holding] {
            let mut readings = self.readings.iter().filter(|r| r.register.kind == kind).peekable();
            if readings.peek().is_some() {
                writeln!(f, "  {kind}:")?;
            }
            for reading in readings {
                let shown = reading.register.display_value(&reading.value);
                writeln!(f, "    {} = {shown} (raw {})", reading.register.name, reading.value.raw())?;
            }
        }
        let derived = self.derived();
        if !derived.is_empty() {
            writeln!(f, "  derived:")?;
        }
        for d in derived {
            match d.value {
                Some(v) => writeln!(f, "    {} = {v:.2}", d.name)?,
                None => writeln!(f, "    {} = n/a", d.name)?,
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Derived {
    pub name: &'static str,
    pub value: Option<f64>,
}

/// A performance figure: the ratio of two registers of the same component.
struct Ratio {
    component: ComponentKind,
    name: &'static str,
    numerator: &'static str,
    denominator: &'static str,
}

impl Ratio {
    fn calculate(&self, snapshot: &Snapshot) -> Option<f64> {
        let numerator = snapshot.value(self.numerator)?.scaled();
        let denominator = snapshot.value(self.denominator)?.scaled();
        (denominator != 0.0).then(|| numerator / denominator)
    }
}

static DERIVED: &[Ratio] = &[
    Ratio {
        component: ComponentKind::HeatPump,
        name: "COP_TOTAL",
        numerator: "THERMAL_ENERGY_TOTAL",
        denominator: "ELECTRICAL_ENERGY_TOTAL",
    },
    Ratio {
        component: ComponentKind::HeatPump,
        name: "COP_HEATING",
        numerator: "THERMAL_ENERGY_HEATING",
        denominator: "ELECTRICAL_ENERGY_HEATING",
    },
    Ratio {
        component: ComponentKind::HeatPump,
        name: "COP_DRINKING_WATER",
        numerator: "THERMAL_ENERGY_DRINKING_WATER",
        denominator: "ELECTRICAL_ENERGY_DRINKING_WATER",
    },
    Ratio {
        component: ComponentKind::HeatPump,
        name: "COP_COOLING",
        numerator: "THERMAL_ENERGY_COOLING",
        denominator: "ELECTRICAL_ENERGY_COOLING",
    },
    Ratio {
        component: ComponentKind::HeatPump,
        name: "CURRENT_COP",
        numerator: "THERMAL_POWER_HEATING",
        denominator: "ELECTRICAL_POWER",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{heat_pump, heating_circuit};
    use crate::registers::DataType;

    #[test]
    fn component_names() {
        let second_circuit = Component::new(ComponentKind::HeatingCircuit, 1);
        assert_eq!(second_circuit.to_string(), "heating-circuit-2");
        assert_eq!("heating-circuit-2".parse::<Component>().unwrap(), second_circuit);
        assert_eq!("HEATING_CIRCUIT_2".parse::<Component>().unwrap(), second_circuit);
        assert_eq!("heating-circuit".parse::<Component>().unwrap().index, 0);
        let heat_pump = Component::new(ComponentKind::HeatPump, 0);
        assert_eq!(heat_pump.to_string(), "heat-pump");
        assert_eq!("heat-pump".parse::<Component>().unwrap(), heat_pump);
        assert!("heating-circuit-9".parse::<Component>().is_err());
        assert!("heating-circuit-0".parse::<Component>().is_err());
        assert!("heat-pump-2".parse::<Component>().is_err());
        assert!("sauna".parse::<Component>().is_err());
    }

    #[test]
    fn base_addresses() {
        let third_circuit = Component::new(ComponentKind::HeatingCircuit, 2);
        assert_eq!(third_circuit.base(RegisterKind::Input), Some(1200));
        assert_eq!(third_circuit.base(RegisterKind::Holding), Some(32700));
        let buffer = Component::new(ComponentKind::Buffer, 1);
        assert_eq!(buffer.base(RegisterKind::Input), Some(1950));
        assert_eq!(buffer.base(RegisterKind::Holding), None);
        let heat_pump = Component::new(ComponentKind::HeatPump, 0);
        let smart_grid = ComponentKind::HeatPump.register("smart-grid").unwrap();
        assert_eq!(heat_pump.address_of(smart_grid), Some(33404));
    }

    #[test]
    fn kinds_without_holding_base_have_no_holding_registers() {
        for kind in <ComponentKind as strum::VariantArray>::VARIANTS {
            if Component::new(*kind, 0).base(RegisterKind::Holding).is_none() {
                assert!(kind.registers().iter().all(|r| r.kind == RegisterKind::Input));
            }
        }
    }

    #[test]
    fn registers_are_filtered_by_version() {
        let pv = Component::new(ComponentKind::Photovoltaic, 0);
        assert_eq!(pv.registers(ApiVersion::V21_140).count(), 0);
        assert_eq!(pv.registers(ApiVersion::V23_020).count(), 4);
        assert_eq!(pv.registers(ApiVersion::LATEST).count(), 5);
    }

    #[test]
    fn layout_components() {
        let layout = Layout {
            system: SystemType::Octoplus,
            heating_circuits: 2,
            solar: true,
            ..Layout::default()
        };
        let ids = layout.components().unwrap().iter().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(
            ids,
            ["heating-circuit-1", "heating-circuit-2", "buffer-1", "boiler-1", "biomass-boiler", "solar"]
        );
        let layout = Layout { heating_circuits: 9, ..Layout::default() };
        assert_eq!(
            layout.components(),
            Err(Error::TooMany { kind: ComponentKind::HeatingCircuit, requested: 9, maximum: 8 })
        );
    }

    fn reading(name: &str, raw: i64) -> Reading {
        let register = ComponentKind::HeatPump.register(name).unwrap();
        Reading { register, value: register.data_type.value(raw).unwrap() }
    }

    #[test]
    fn performance_figures() {
        let snapshot = Snapshot {
            component: Component::new(ComponentKind::HeatPump, 0),
            readings: vec![
                reading("THERMAL_ENERGY_TOTAL", 4000),
                reading("THERMAL_ENERGY_HEATING", 3000),
                reading("ELECTRICAL_ENERGY_TOTAL", 1000),
                reading("ELECTRICAL_ENERGY_HEATING", 0),
                reading("ELECTRICAL_POWER", 500),
                reading("THERMAL_POWER_HEATING", 2000),
            ],
        };
        let derived = snapshot.derived();
        let get = |name| derived.iter().find(|d| d.name == name).unwrap().value;
        assert_eq!(get("COP_TOTAL"), Some(4.0));
        assert_eq!(get("COP_HEATING"), None);
        assert_eq!(get("COP_DRINKING_WATER"), None);
        assert_eq!(get("CURRENT_COP"), Some(4.0));
    }

    #[test]
    fn typed_access() {
        let snapshot = Snapshot {
            component: Component::new(ComponentKind::HeatPump, 0),
            readings: vec![reading("SUPPLY_TEMPERATURE", 352), reading("THERMAL_ENERGY_TOTAL", 70000)],
        };
        assert_eq!(snapshot.get(heat_pump::SUPPLY_TEMPERATURE), Ok(35.2));
        assert_eq!(snapshot.get(heat_pump::THERMAL_ENERGY_TOTAL), Ok(70000));
        assert_eq!(
            snapshot.get(heat_pump::RETURN_TEMPERATURE),
            Err(DecodeError::Missing("RETURN_TEMPERATURE"))
        );
        assert_eq!(
            snapshot.get(heating_circuit::SUPPLY_TEMPERATURE),
            Err(DecodeError::WrongComponent {
                register: "SUPPLY_TEMPERATURE",
                component: ComponentKind::HeatPump,
            })
        );
        assert_eq!(snapshot.value("supply-temperature").map(|v| v.data_type()), Some(DataType::CEL));
    }

    #[test]
    fn display_groups_by_register_kind() {
        let snapshot = Snapshot {
            component: Component::new(ComponentKind::HeatPump, 0),
            readings: vec![reading("SUPPLY_TEMPERATURE", 352), reading("SMART_GRID", 2)],
        };
        let text = snapshot.to_string();
        assert!(text.starts_with("heat-pump\n  input:\n    SUPPLY_TEMPERATURE = 35.2 °C (raw 352)\n"));
        assert!(text.contains("  holding:\n    SMART_GRID = normal (raw 2)\n"));
        assert!(text.contains("    COP_TOTAL = n/a\n"));
    }
}
