use crate::states::StateTable;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} register words, got {got}")]
    WrongLength { expected: usize, got: usize },
    #[error("{raw} is not a known {table} value")]
    UnknownState { table: &'static str, raw: i64 },
    #[error("{raw} does not fit the requested integer type")]
    Overflow { raw: i64 },
    #[error("register {0} has not been read")]
    Missing(&'static str),
    #[error("{register} is not a register of {component}")]
    WrongComponent { register: &'static str, component: crate::components::ComponentKind },
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EncodeError {
    #[error("{0} is not a finite number")]
    NotFinite(f64),
    #[error("{value} cannot be represented as {data_type}")]
    Overflow { value: f64, data_type: DataType },
}

#[derive(Clone, Copy, Debug, serde::Serialize, PartialEq, Eq)]
pub struct DataType {
    scale: u16,
    signed: bool,
    words: u8,
}

impl DataType {
    // Short aliases so that the register tables stay nicely tabulated.
    pub const U16: Self = Self { scale: 1, signed: false, words: 1 };
    pub const I16: Self = Self { scale: 1, signed: true, words: 1 };
    pub const U32: Self = Self { scale: 1, signed: false, words: 2 };
    pub const I32: Self = Self { scale: 1, signed: true, words: 2 };
    /// Temperatures in tenths of a degree.
    pub const CEL: Self = Self { scale: 10, signed: true, words: 1 };
    pub const DEC: Self = Self { scale: 10, signed: false, words: 1 };
    pub const CENT: Self = Self { scale: 100, signed: false, words: 1 };
    pub const DEC32: Self = Self { scale: 10, signed: false, words: 2 };

    pub const fn is_signed(&self) -> bool {
        self.signed
    }

    pub const fn scale(&self) -> u16 {
        self.scale
    }

    pub const fn words(&self) -> usize {
        self.words as usize
    }

    /// The smallest and the largest raw value this type can hold.
    pub const fn raw_range(&self) -> (i64, i64) {
        let bits = 16 * self.words as u32;
        if self.signed {
            (-(1 << (bits - 1)), (1 << (bits - 1)) - 1)
        } else {
            (0, (1 << bits) - 1)
        }
    }

    /// Decode the register words, most significant word first.
    pub fn decode(self, words: &[u16]) -> Result<Value, DecodeError> {
        if words.len() != self.words() {
            return Err(DecodeError::WrongLength { expected: self.words(), got: words.len() });
        }
        let unsigned = words.iter().fold(0u32, |acc, w| (acc << 16) | u32::from(*w));
        let raw = match (self.words, self.signed) {
            (1, true) => i64::from(unsigned as u16 as i16),
            (_, true) => i64::from(unsigned as i32),
            (_, false) => i64::from(unsigned),
        };
        Ok(Value { raw, data_type: self })
    }

    pub fn value(self, raw: i64) -> Result<Value, EncodeError> {
        let (min, max) = self.raw_range();
        if raw < min || raw > max {
            return Err(EncodeError::Overflow { value: raw as f64, data_type: self });
        }
        Ok(Value { raw, data_type: self })
    }

    /// Encode a physical value, rounding to the resolution of this type.
    pub fn from_scaled(self, scaled: f64) -> Result<Value, EncodeError> {
        if !scaled.is_finite() {
            return Err(EncodeError::NotFinite(scaled));
        }
        let raw = (scaled * f64::from(self.scale)).round();
        let (min, max) = self.raw_range();
        if raw < min as f64 || raw > max as f64 {
            return Err(EncodeError::Overflow { value: scaled, data_type: self });
        }
        self.value(raw as i64)
    }

    fn decimals(&self) -> usize {
        match self.scale {
            0..=1 => 0,
            2..=10 => 1,
            11..=100 => 2,
            _ => 3,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.signed { "i" } else { "u" })?;
        f.write_fmt(format_args!("{}", 16 * u32::from(self.words)))?;
        if self.scale != 1 {
            f.write_fmt(format_args!("/{}", self.scale))?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Value {
    raw: i64,
    data_type: DataType,
}

impl Value {
    pub fn raw(&self) -> i64 {
        self.raw
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn scaled(&self) -> f64 {
        self.raw as f64 / f64::from(self.data_type.scale)
    }

    /// Inverse of [`DataType::decode`].
    pub fn to_words(&self) -> Vec<u16> {
        let bits = self.raw as u32;
        match self.data_type.words {
            1 => vec![bits as u16],
            _ => vec![(bits >> 16) as u16, bits as u16],
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.data_type.decimals() {
            0 => f.write_fmt(format_args!("{}", self.raw)),
            decimals => f.write_fmt(format_args!("{:.*}", decimals, self.scaled())),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.data_type.scale == 1 {
            serializer.serialize_i64(self.raw)
        } else {
            serializer.serialize_f64(self.scaled())
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct Mode(u8);

impl serde::Serialize for Mode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0 & Self::R.0 == 0 { "-" } else { "R" })?;
        f.write_str(if self.0 & Self::W.0 == 0 { "-" } else { "W" })?;
        Ok(())
    }
}

impl Mode {
    pub const R: Self = Self(1 << 0);
    pub const W: Self = Self(1 << 1);
    pub const RW: Self = Self(Self::R.0 | Self::W.0);
    pub(crate) const R_: Self = Self::R;

    pub const fn is_writable(&self) -> bool {
        self.0 & Self::W.0 != 0
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, serde::Serialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RegisterKind {
    Input,
    Holding,
}

/// Firmware revisions of the controller's Modbus interface.
///
/// Registers introduced in a later revision are not read from controllers running an older one.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::Display,
    strum::VariantArray,
)]
pub enum ApiVersion {
    #[strum(serialize = "21.140")]
    V21_140,
    #[strum(serialize = "22.090")]
    V22_090,
    #[strum(serialize = "23.010")]
    V23_010,
    #[strum(serialize = "23.020")]
    V23_020,
    #[strum(serialize = "23.040")]
    V23_040,
    #[strum(serialize = "23.080")]
    V23_080,
    #[strum(serialize = "25.030")]
    V25_030,
}

impl ApiVersion {
    pub const LATEST: Self = Self::V25_030;
}

impl serde::Serialize for ApiVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(<&'static str>::from(self))
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Unit {
    None,
    Celsius,
    Percent,
    Watt,
    Kilowatt,
    KilowattHour,
    LitersPerHour,
    Kilogram,
    Hours,
    State(&'static StateTable),
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Celsius => "°C",
            Unit::Percent => "%",
            Unit::Watt => "W",
            Unit::Kilowatt => "kW",
            Unit::KilowattHour => "kWh",
            Unit::LitersPerHour => "l/h",
            Unit::Kilogram => "kg",
            Unit::Hours => "h",
            Unit::State(_) => "",
        }
    }

    pub fn states(&self) -> Option<&'static StateTable> {
        match self {
            Unit::State(table) => Some(table),
            _ => None,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::State(table) => f.write_str(table.name),
            _ => f.write_str(self.symbol()),
        }
    }
}

impl serde::Serialize for Unit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// One entry of a component's register table.
#[derive(Debug)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub kind: RegisterKind,
    /// Relative to the base address of the component instance for `kind`.
    pub offset: u16,
    pub data_type: DataType,
    pub mode: Mode,
    pub unit: Unit,
    /// Raw bounds accepted on write.
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub since: ApiVersion,
    pub description: &'static str,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WriteCheckError {
    #[error("register {0} is read-only")]
    ReadOnly(&'static str),
    #[error("{value} is out of range for {name} (allowed {minimum}..={maximum})")]
    OutOfRange { name: &'static str, value: Value, minimum: Value, maximum: Value },
}

impl RegisterSpec {
    pub fn end_offset(&self) -> u16 {
        self.offset + self.data_type.words() as u16
    }

    pub fn is_available(&self, version: ApiVersion) -> bool {
        self.since <= version
    }

    pub fn check_write(&self, value: &Value) -> Result<(), WriteCheckError> {
        if !self.mode.is_writable() {
            return Err(WriteCheckError::ReadOnly(self.name));
        }
        let (type_min, type_max) = self.data_type.raw_range();
        let minimum = self.minimum.unwrap_or(type_min);
        let maximum = self.maximum.unwrap_or(type_max);
        if value.raw < minimum || value.raw > maximum {
            return Err(WriteCheckError::OutOfRange {
                name: self.name,
                value: *value,
                minimum: Value { raw: minimum, data_type: self.data_type },
                maximum: Value { raw: maximum, data_type: self.data_type },
            });
        }
        Ok(())
    }

    /// Parse user input for this register: a state label for enumerated registers, or a
    /// number in physical units.
    pub fn parse_value(&self, text: &str) -> Result<Value, ParseValueError> {
        if let Some(states) = self.unit.states() {
            let raw = states.parse(text).ok_or_else(|| ParseValueError::UnknownState {
                text: text.to_string(),
                expected: states.to_string(),
            })?;
            return Ok(self.data_type.value(i64::from(raw))?);
        }
        let number = text
            .trim()
            .parse::<f64>()
            .map_err(|e| ParseValueError::NotANumber(e, text.to_string()))?;
        Ok(self.data_type.from_scaled(number)?)
    }

    /// Human readable rendering of a value read from this register.
    pub fn display_value(&self, value: &Value) -> String {
        match self.unit {
            Unit::State(table) => match table.label(value.raw) {
                Some(label) => label.to_string(),
                None => format!("unknown ({})", value.raw),
            },
            Unit::None => value.to_string(),
            unit => format!("{value} {}", unit.symbol()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ParseValueError {
    #[error("`{text}` is not one of: {expected}")]
    UnknownState { text: String, expected: String },
    #[error("`{1}` is not a number")]
    NotANumber(#[source] std::num::ParseFloatError, String),
    #[error("the value cannot be encoded")]
    Encode(#[from] EncodeError),
}
