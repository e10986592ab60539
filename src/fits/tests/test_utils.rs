use crate::fits::data::DataArray;
use crate::fits::extension::Extension;
use crate::fits::header::{Card, Header, Value};
use crate::fits::keywords::layout;
use crate::utils::logger::Logger;

/// Logger writing into the system temp directory
pub fn test_logger(name: &str) -> Logger {
    let path = std::env::temp_dir().join(name);
    Logger::new(path.to_str().unwrap()).unwrap()
}

/// Pads one card image out to its 80-byte form
pub fn card_image(text: &str) -> Vec<u8> {
    assert!(text.len() <= layout::CARD_SIZE, "card text too long: {}", text);
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(layout::CARD_SIZE, b' ');
    bytes
}

/// Pads a byte run to a whole number of blocks with the given fill
pub fn pad_block(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % layout::BLOCK_SIZE != 0 {
        bytes.push(fill);
    }
}

/// Serializes a header unit from card texts, END and padding appended
pub fn header_unit(cards: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for text in cards {
        bytes.extend(card_image(text));
    }
    bytes.extend(card_image("END"));
    pad_block(&mut bytes, b' ');
    bytes
}

/// Serializes a data unit, zero-padded to the block boundary
pub fn data_unit(data: &[u8]) -> Vec<u8> {
    let mut bytes = data.to_vec();
    pad_block(&mut bytes, 0);
    bytes
}

/// Card texts for a primary image HDU, axes in header order
pub fn primary_cards(bitpix: i64, axes: &[usize]) -> Vec<String> {
    let mut cards = vec![
        "SIMPLE  =                    T / conforms to FITS standard".to_string(),
        format!("BITPIX  = {:>20}", bitpix),
        format!("NAXIS   = {:>20}", axes.len()),
    ];
    for (i, len) in axes.iter().enumerate() {
        cards.push(format!("NAXIS{:<3}= {:>20}", i + 1, len));
    }
    cards
}

/// Card texts for an IMAGE extension HDU, axes in header order
pub fn image_extension_cards(bitpix: i64, axes: &[usize], name: Option<&str>) -> Vec<String> {
    let mut cards = vec![
        "XTENSION= 'IMAGE   '".to_string(),
        format!("BITPIX  = {:>20}", bitpix),
        format!("NAXIS   = {:>20}", axes.len()),
    ];
    for (i, len) in axes.iter().enumerate() {
        cards.push(format!("NAXIS{:<3}= {:>20}", i + 1, len));
    }
    cards.push("PCOUNT  =                    0".to_string());
    cards.push("GCOUNT  =                    1".to_string());
    if let Some(name) = name {
        cards.push(format!("EXTNAME = '{:<8}'", name));
    }
    cards
}

/// A complete single-HDU file with BITPIX 8 data, axes in header order
pub fn single_image_file(axes: &[usize], data: &[u8]) -> Vec<u8> {
    let cards = primary_cards(8, axes);
    let refs: Vec<&str> = cards.iter().map(String::as_str).collect();
    let mut bytes = header_unit(&refs);
    bytes.extend(data_unit(data));
    bytes
}

/// Sequential sample bytes for a given element count
pub fn counting_bytes(count: usize) -> Vec<u8> {
    (0..count).map(|i| (i % 256) as u8).collect()
}

/// A model header built from keyword/value pairs
pub fn model_header(values: &[(&str, Value)]) -> Header {
    let mut header = Header::new();
    for (keyword, value) in values {
        header.push(Card::new(keyword, value.clone()));
    }
    header
}

/// A model image extension with BITPIX 8 counting data
///
/// The shape is given in header order; the array is stored reversed, the
/// way the reader would build it.
pub fn model_image_extension(axes: &[usize], source_index: usize) -> Extension {
    let mut header = Header::new();
    if source_index == 0 {
        header.push(Card::new("SIMPLE", Value::Logical(true)));
    } else {
        header.push(Card::new("XTENSION", Value::Str("IMAGE".to_string())));
    }
    header.push(Card::new("BITPIX", Value::Integer(8)));
    header.push(Card::new("NAXIS", Value::Integer(axes.len() as i64)));
    for (i, len) in axes.iter().enumerate() {
        header.push(Card::new(&format!("NAXIS{}", i + 1), Value::Integer(*len as i64)));
    }

    let mut shape: Vec<usize> = axes.to_vec();
    shape.reverse();
    let count: usize = shape.iter().product();
    let data = DataArray::new(8, shape, counting_bytes(count)).unwrap();
    Extension::new(header, Some(data), source_index)
}
