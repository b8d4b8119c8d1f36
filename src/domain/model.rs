use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

/// Descriptor of one schema field; the description doubles as model guidance.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str, description: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        description,
        kind: FieldKind::Text,
    }
}

/// The 14 characteristics in output order.
pub const FIELDS: [FieldSpec; 14] = [
    text("company_name", "Название компании производителя печатной платы"),
    text("board_name", "Название печатной платы"),
    text("base_material", "Материал основания печатной платы"),
    text("foil_thickness", "Толщина фольги"),
    FieldSpec {
        name: "layer_count",
        description: "Количество слоев печатной платы",
        kind: FieldKind::Integer,
    },
    text("coverage_type", "Финишное покрытие площадок"),
    text("board_size", "Размер печатной платы"),
    text("panelization", "Панелизация печатной платы"),
    text("solder_mask_colour", "Наличие маски /цвет"),
    text("solder_mark_colour", "Наличие маркировки маркировочной краской/цвет"),
    text("soldering_surface", "Монтаж печатных плат"),
    text("electrical_testing", "Электротестирование"),
    text("edge_plating", "Металлизированный торец платы"),
    text("contour_treatment", "Мех обработка контура"),
];

/// Name of the schema as presented to the model.
pub const SCHEMA_NAME: &str = "PCBCharacteristics";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacteristicValue::Integer(n) => write!(f, "{}", n),
            CharacteristicValue::Text(s) => f.write_str(s),
        }
    }
}

/// One `Characteristic`/`Value` row of the output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicRow {
    #[serde(rename = "Characteristic")]
    pub characteristic: String,
    #[serde(rename = "Value")]
    pub value: CharacteristicValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcbCharacteristics {
    pub company_name: String,
    pub board_name: String,
    pub base_material: String,
    pub foil_thickness: String,
    pub layer_count: i64,
    pub coverage_type: String,
    pub board_size: String,
    pub panelization: String,
    pub solder_mask_colour: String,
    pub solder_mark_colour: String,
    pub soldering_surface: String,
    pub electrical_testing: String,
    pub edge_plating: String,
    pub contour_treatment: String,
}

impl PcbCharacteristics {
    /// Coerces loosely shaped model output into the record.
    ///
    /// Unknown keys are ignored and missing or null keys keep their default.
    /// Anything that is not a JSON object yields the default record.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let field_text = |key: &str| obj.get(key).map(coerce_text).unwrap_or_default();

        Self {
            company_name: field_text("company_name"),
            board_name: field_text("board_name"),
            base_material: field_text("base_material"),
            foil_thickness: field_text("foil_thickness"),
            layer_count: obj.get("layer_count").map(coerce_integer).unwrap_or_default(),
            coverage_type: field_text("coverage_type"),
            board_size: field_text("board_size"),
            panelization: field_text("panelization"),
            solder_mask_colour: field_text("solder_mask_colour"),
            solder_mark_colour: field_text("solder_mark_colour"),
            soldering_surface: field_text("soldering_surface"),
            electrical_testing: field_text("electrical_testing"),
            edge_plating: field_text("edge_plating"),
            contour_treatment: field_text("contour_treatment"),
        }
    }

    /// All 14 characteristics in the order of [`FIELDS`].
    pub fn entries(&self) -> Vec<(&'static str, CharacteristicValue)> {
        let values = [
            CharacteristicValue::Text(self.company_name.clone()),
            CharacteristicValue::Text(self.board_name.clone()),
            CharacteristicValue::Text(self.base_material.clone()),
            CharacteristicValue::Text(self.foil_thickness.clone()),
            CharacteristicValue::Integer(self.layer_count),
            CharacteristicValue::Text(self.coverage_type.clone()),
            CharacteristicValue::Text(self.board_size.clone()),
            CharacteristicValue::Text(self.panelization.clone()),
            CharacteristicValue::Text(self.solder_mask_colour.clone()),
            CharacteristicValue::Text(self.solder_mark_colour.clone()),
            CharacteristicValue::Text(self.soldering_surface.clone()),
            CharacteristicValue::Text(self.electrical_testing.clone()),
            CharacteristicValue::Text(self.edge_plating.clone()),
            CharacteristicValue::Text(self.contour_treatment.clone()),
        ];

        FIELDS.iter().map(|f| f.name).zip(values).collect()
    }

    pub fn rows(&self) -> Vec<CharacteristicRow> {
        self.entries()
            .into_iter()
            .map(|(name, value)| CharacteristicRow {
                characteristic: name.to_string(),
                value,
            })
            .collect()
    }
}

/// Two aligned columns, one characteristic per line.
impl fmt::Display for PcbCharacteristics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = FIELDS.iter().map(|field| field.name.len()).max().unwrap_or(0);
        for (name, value) in self.entries() {
            writeln!(f, "{:<width$}  {}", name, value, width = width)?;
        }
        Ok(())
    }
}

/// JSON schema of [`PcbCharacteristics`], used as tool parameters.
pub fn json_schema() -> Value {
    let mut properties = Map::new();
    for field in FIELDS.iter() {
        let property = match field.kind {
            FieldKind::Text => json!({
                "type": "string",
                "description": field.description,
                "default": "",
            }),
            FieldKind::Integer => json!({
                "type": "integer",
                "description": field.description,
                "default": 0,
            }),
        };
        properties.insert(field.name.to_string(), property);
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": [],
    })
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(coerce_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn coerce_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        // "4 слоя" -> 4
        Value::String(s) => {
            let digits: String = s
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Plain-text rendering of a workbook, ready for prompting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetText {
    pub source_name: String,
    pub text: String,
    pub sheet_count: usize,
}

impl SheetText {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub csv: PathBuf,
    pub xlsx: PathBuf,
    pub json: PathBuf,
    pub bundle: Option<PathBuf>,
}

impl OutputFiles {
    pub fn paths(&self) -> Vec<&PathBuf> {
        let mut paths = vec![&self.csv, &self.xlsx, &self.json];
        if let Some(bundle) = &self.bundle {
            paths.push(bundle);
        }
        paths
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub characteristics: PcbCharacteristics,
    pub files: OutputFiles,
}
