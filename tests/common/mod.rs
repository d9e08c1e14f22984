#![allow(dead_code)]

use pickup_sheet::spreadsheet::Sheet;
use pickup_sheet::spreadsheet::Spreadsheet;
use pickup_sheet::spreadsheet::XlsxSpreadsheet;
use rust_xlsxwriter::Format;
use rust_xlsxwriter::Workbook;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// A key-column value of the customer fixture.
pub enum Value<'a> {
    Text(&'a str),
    Number(f64),
}

/// Writes a data source whose `Sheet2` column B holds `rows` as (zero-based row, value).
/// `Sheet1` carries unrelated content, as real data sources do.
pub fn write_customers(path: &Path, rows: &[(u32, Value)]) {
    let mut workbook = Workbook::new();
    let first = workbook.add_worksheet().set_name("Sheet1").unwrap();
    first.write_string(0, 1, "张三").unwrap();
    first.write_string(1, 1, "不是这一页").unwrap();

    let second = workbook.add_worksheet().set_name("Sheet2").unwrap();
    second.write_string(0, 0, "客户资料").unwrap();
    for (row, value) in rows {
        match value {
            Value::Text(text) => second.write_string(*row, 1, *text).unwrap(),
            Value::Number(number) => second.write_number(*row, 1, *number).unwrap(),
        };
        // neighbouring columns must not leak into records
        second.write_string(*row, 2, "C列").unwrap();
    }
    workbook.save(path).unwrap();
}

/// The customer block of the documented layout: 张三 at row 5 with phone,
/// address, and extra below.
pub fn write_scenario_customers(path: &Path) {
    write_customers(
        path,
        &[
            (4, Value::Text("张三")),
            (5, Value::Number(13800000000.0)),
            (6, Value::Text("北京市")),
            (7, Value::Text("VIP")),
            (8, Value::Text("李四")),
            (9, Value::Text("13900000000")),
            (10, Value::Text("上海市")),
        ],
    );
}

/// Writes a pickup-slip template with a styled, empty date cell at C2.
pub fn write_template(path: &Path) {
    let mut workbook = Workbook::new();
    let title = Format::new().set_bold();
    let date = Format::new().set_italic();

    let sheet = workbook.add_worksheet().set_name("1").unwrap();
    sheet.merge_range(0, 0, 0, 3, "提货单", &title).unwrap();
    sheet.write_string(1, 0, "日期").unwrap();
    sheet.write_blank(1, 2, &date).unwrap();
    sheet.write_string(2, 0, "客户").unwrap();
    sheet.write_string(2, 2, "电话").unwrap();
    sheet.write_string(3, 0, "地址").unwrap();
    sheet.write_string(3, 2, "备注").unwrap();
    sheet.write_string(4, 1, "品名").unwrap();
    sheet.write_string(4, 2, "数量").unwrap();
    sheet.write_string(4, 3, "温度").unwrap();
    sheet.write_string(5, 0, "1").unwrap();
    // a stale value the projector has to replace
    sheet.write_string(5, 1, "旧品名").unwrap();
    sheet.write_string(8, 0, "签收:").unwrap();

    let notes = workbook.add_worksheet().set_name("说明").unwrap();
    notes.write_string(0, 0, "请勿修改本模板").unwrap();
    workbook.save(path).unwrap();
}

pub fn read_sheet(path: &Path, name: &str) -> Sheet {
    let mut spreadsheet = XlsxSpreadsheet::open(path).unwrap();
    spreadsheet.read_sheet(name).unwrap()
}

/// All package entries as name -> uncompressed bytes.
pub fn zip_entries(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        entries.insert(file.name().to_owned(), bytes);
    }
    entries
}
