//! Serializers for the `Characteristic`/`Value` table.

use crate::domain::model::{CharacteristicValue, PcbCharacteristics};
use crate::utils::error::{EtlError, Result};
use rust_xlsxwriter::{Format, Workbook};
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

pub const OUTPUT_SUFFIX: &str = "_pcb_parsed";
pub const CHARACTERISTIC_HEADER: &str = "Characteristic";
pub const VALUE_HEADER: &str = "Value";

/// File names derived from one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNames {
    pub csv: String,
    pub xlsx: String,
    pub json: String,
    pub bundle: String,
}

/// The input's file name up to its first `.`; directories are ignored.
pub fn base_name(input_path: &str) -> String {
    let file_name = Path::new(input_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    file_name.split('.').next().unwrap_or_default().to_string()
}

pub fn output_names(input_path: &str) -> OutputNames {
    let stem = format!("{}{}", base_name(input_path), OUTPUT_SUFFIX);
    OutputNames {
        csv: format!("{}.csv", stem),
        xlsx: format!("{}.xlsx", stem),
        json: format!("{}.json", stem),
        bundle: format!("{}.zip", stem),
    }
}

pub fn render_csv(record: &PcbCharacteristics) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([CHARACTERISTIC_HEADER, VALUE_HEADER])?;
    for (name, value) in record.entries() {
        writer.write_record([name, value.to_string().as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

pub fn render_xlsx(record: &PcbCharacteristics) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Sheet1")?;
    worksheet.write_string_with_format(0, 0, CHARACTERISTIC_HEADER, &header)?;
    worksheet.write_string_with_format(0, 1, VALUE_HEADER, &header)?;

    for (index, (name, value)) in record.entries().into_iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, name)?;
        match value {
            CharacteristicValue::Integer(n) => {
                worksheet.write_number(row, 1, n as f64)?;
            }
            CharacteristicValue::Text(s) => {
                worksheet.write_string(row, 1, s)?;
            }
        }
    }
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

pub fn render_json(record: &PcbCharacteristics) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&record.rows())?)
}

/// Packs already rendered files into one ZIP archive.
pub fn render_bundle(files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(*name, FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PcbCharacteristics {
        PcbCharacteristics {
            company_name: "ООО \"Плата\", Москва".to_string(),
            board_name: "MB-01".to_string(),
            layer_count: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_base_name_strips_from_first_dot() {
        assert_eq!(base_name("board.xlsx"), "board");
        assert_eq!(base_name("/tmp/uploads/order.v2.xls"), "order");
        assert_eq!(base_name("relative/dir.d/board.xlsx"), "board");
    }

    #[test]
    fn test_output_names() {
        let names = output_names("data/Заказ 17.xlsx");
        assert_eq!(names.csv, "Заказ 17_pcb_parsed.csv");
        assert_eq!(names.xlsx, "Заказ 17_pcb_parsed.xlsx");
        assert_eq!(names.json, "Заказ 17_pcb_parsed.json");
        assert_eq!(names.bundle, "Заказ 17_pcb_parsed.zip");
    }

    #[test]
    fn test_render_csv_quotes_and_orders_rows() {
        let csv_text = String::from_utf8(render_csv(&sample()).unwrap()).unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();

        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0], "Characteristic,Value");
        assert_eq!(lines[1], "company_name,\"ООО \"\"Плата\"\", Москва\"");
        assert_eq!(lines[2], "board_name,MB-01");
        assert_eq!(lines[5], "layer_count,4");
        assert_eq!(lines[14], "contour_treatment,");
    }

    #[test]
    fn test_render_json_rows() {
        let value: serde_json::Value =
            serde_json::from_slice(&render_json(&sample()).unwrap()).unwrap();
        let rows = value.as_array().unwrap();

        assert_eq!(rows.len(), 14);
        assert_eq!(rows[1]["Characteristic"], "board_name");
        assert_eq!(rows[1]["Value"], "MB-01");
        assert_eq!(rows[4]["Value"], 4);
    }

    #[test]
    fn test_render_xlsx_produces_workbook() {
        let bytes = render_xlsx(&sample()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_render_bundle_contains_all_files() {
        let bundle = render_bundle(&[("a.csv", b"x".as_slice()), ("a.json", b"[]".as_slice())])
            .unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bundle)).unwrap();

        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("a.json").unwrap(), &mut content)
            .unwrap();
        assert_eq!(content, "[]");
    }
}
