use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Highest row/column addressable in an `.xlsx` sheet
const MAX_ROWS: u32 = 1_048_576;
const MAX_COLS: u32 = 16_384;

static CELL_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{1,3})([1-9][0-9]{0,6})$").expect("valid cell regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Field {0} is declared more than once")]
    DuplicateField(SheetField),

    #[error("Field {0} is missing from the layout")]
    MissingField(SheetField),

    #[error("Cell {cell} is used by both {first} and {second}")]
    OverlappingCells {
        cell: CellRef,
        first: SheetField,
        second: SheetField,
    },

    #[error("Row fields must start on the same row, found {0} and {1}")]
    MisalignedRows(CellRef, CellRef),

    #[error("Data rows start at {0}, which is not below every header cell")]
    RowsOverlapHeader(CellRef),

    #[error("At least one row field must be required to terminate the row scan")]
    NoRowSentinel,
}

/// Zero-based cell coordinates, written and parsed in A1 notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Same column, `offset` rows further down
    pub fn below(self, offset: u32) -> Self {
        Self {
            row: self.row + offset,
            col: self.col,
        }
    }

    /// Absolute position as used by `calamine::Range::get_value`
    pub fn position(self) -> (u32, u32) {
        (self.row, self.col as u32)
    }

    fn column_letters(self) -> String {
        let mut n = self.col as u32 + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(char::from(b'A' + rem as u8));
            n = (n - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl FromStr for CellRef {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LayoutError::InvalidReference(s.to_string());
        let caps = CELL_REF_RE.captures(s.trim()).ok_or_else(invalid)?;

        let col = caps[1]
            .bytes()
            .fold(0u32, |acc, b| acc * 26 + (b - b'A' + 1) as u32);
        let row: u32 = caps[2].parse().map_err(|_| invalid())?;

        if col > MAX_COLS || row > MAX_ROWS {
            return Err(invalid());
        }

        Ok(Self {
            row: row - 1,
            col: (col - 1) as u16,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row + 1)
    }
}

/// Values a delivery sheet carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetField {
    ArrivalDate,
    InvoiceRef,
    Model,
    Brand,
    FrameNumber,
    Color,
}

impl SheetField {
    pub fn name(self) -> &'static str {
        match self {
            SheetField::ArrivalDate => "arrival_date",
            SheetField::InvoiceRef => "invoice_ref",
            SheetField::Model => "model",
            SheetField::Brand => "brand",
            SheetField::FrameNumber => "frame_number",
            SheetField::Color => "color",
        }
    }

    /// Row fields repeat down the sheet; the others are read once from the header
    pub fn is_row_field(self) -> bool {
        matches!(self, SheetField::FrameNumber | SheetField::Color)
    }
}

impl fmt::Display for SheetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a layout declaration
///
/// For row fields `cell` is the first data row; later rows are read below it.
/// A required header cell that is empty fails the extraction, a required row
/// cell that is empty ends the row scan.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: SheetField,
    pub cell: &'static str,
    pub required: bool,
}

/// Coordinates of the supplier delivery sheets. Existing files depend on these.
pub const STANDARD_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: SheetField::ArrivalDate,
        cell: "B2",
        required: false,
    },
    FieldSpec {
        field: SheetField::InvoiceRef,
        cell: "B4",
        required: false,
    },
    FieldSpec {
        field: SheetField::Model,
        cell: "E4",
        required: false,
    },
    FieldSpec {
        field: SheetField::Brand,
        cell: "F4",
        required: false,
    },
    FieldSpec {
        field: SheetField::FrameNumber,
        cell: "D7",
        required: true,
    },
    FieldSpec {
        field: SheetField::Color,
        cell: "E7",
        required: true,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutCell {
    pub cell: CellRef,
    pub required: bool,
}

/// A validated sheet layout
///
/// Built once from a [`FieldSpec`] list; every field is present exactly once and
/// no two fields share a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub arrival_date: LayoutCell,
    pub invoice_ref: LayoutCell,
    pub model: LayoutCell,
    pub brand: LayoutCell,
    pub frame_number: LayoutCell,
    pub color: LayoutCell,
}

impl SheetLayout {
    pub fn standard() -> Result<Self, LayoutError> {
        Self::from_specs(STANDARD_FIELDS)
    }

    pub fn from_specs(specs: &[FieldSpec]) -> Result<Self, LayoutError> {
        let mut fields: HashMap<SheetField, LayoutCell> = HashMap::new();
        let mut owners: HashMap<CellRef, SheetField> = HashMap::new();

        for spec in specs {
            let cell: CellRef = spec.cell.parse()?;

            if let Some(first) = owners.insert(cell, spec.field) {
                return Err(LayoutError::OverlappingCells {
                    cell,
                    first,
                    second: spec.field,
                });
            }

            let resolved = LayoutCell {
                cell,
                required: spec.required,
            };
            if fields.insert(spec.field, resolved).is_some() {
                return Err(LayoutError::DuplicateField(spec.field));
            }
        }

        let take = |field: SheetField| {
            fields
                .get(&field)
                .copied()
                .ok_or(LayoutError::MissingField(field))
        };
        let layout = Self {
            arrival_date: take(SheetField::ArrivalDate)?,
            invoice_ref: take(SheetField::InvoiceRef)?,
            model: take(SheetField::Model)?,
            brand: take(SheetField::Brand)?,
            frame_number: take(SheetField::FrameNumber)?,
            color: take(SheetField::Color)?,
        };

        if layout.frame_number.cell.row != layout.color.cell.row {
            return Err(LayoutError::MisalignedRows(
                layout.frame_number.cell,
                layout.color.cell,
            ));
        }

        let last_header_row = layout
            .header_cells()
            .iter()
            .map(|(_, lc)| lc.cell.row)
            .max()
            .unwrap_or(0);
        if layout.first_data_row() <= last_header_row {
            return Err(LayoutError::RowsOverlapHeader(layout.frame_number.cell));
        }

        if !layout.frame_number.required && !layout.color.required {
            return Err(LayoutError::NoRowSentinel);
        }

        Ok(layout)
    }

    /// Zero-based index of the first data row
    pub fn first_data_row(&self) -> u32 {
        self.frame_number.cell.row
    }

    pub fn header_cells(&self) -> [(SheetField, LayoutCell); 4] {
        [
            (SheetField::ArrivalDate, self.arrival_date),
            (SheetField::InvoiceRef, self.invoice_ref),
            (SheetField::Model, self.model),
            (SheetField::Brand, self.brand),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_ref_parse() {
        assert_eq!("A1".parse::<CellRef>().unwrap(), CellRef::new(0, 0));
        assert_eq!("B4".parse::<CellRef>().unwrap(), CellRef::new(3, 1));
        assert_eq!("AA10".parse::<CellRef>().unwrap(), CellRef::new(9, 26));
        assert_eq!("XFD1".parse::<CellRef>().unwrap(), CellRef::new(0, 16_383));
    }

    #[test]
    fn test_cell_ref_rejects_garbage() {
        for bad in ["", "4B", "B0", "b4", "XFE1", "B1048577", "B-1"] {
            assert!(bad.parse::<CellRef>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_cell_ref_display_round_trip() {
        for reference in ["A1", "D7", "Z99", "AA1", "AZ12", "XFD1048576"] {
            let cell: CellRef = reference.parse().unwrap();
            assert_eq!(cell.to_string(), reference);
        }
    }

    #[test]
    fn test_standard_layout_coordinates() {
        let layout = SheetLayout::standard().unwrap();
        assert_eq!(layout.invoice_ref.cell.to_string(), "B4");
        assert_eq!(layout.model.cell.to_string(), "E4");
        assert_eq!(layout.brand.cell.to_string(), "F4");
        assert_eq!(layout.arrival_date.cell.to_string(), "B2");
        assert_eq!(layout.frame_number.cell.to_string(), "D7");
        assert_eq!(layout.color.cell.to_string(), "E7");
        assert_eq!(layout.first_data_row(), 6);
        assert!(layout.frame_number.required && layout.color.required);
    }

    fn specs_with(field: SheetField, cell: &'static str) -> Vec<FieldSpec> {
        STANDARD_FIELDS
            .iter()
            .map(|spec| {
                if spec.field == field {
                    FieldSpec { cell, ..*spec }
                } else {
                    *spec
                }
            })
            .collect()
    }

    #[test]
    fn test_layout_rejects_overlapping_cells() {
        let specs = specs_with(SheetField::Model, "B4");
        assert!(matches!(
            SheetLayout::from_specs(&specs),
            Err(LayoutError::OverlappingCells { .. })
        ));
    }

    #[test]
    fn test_layout_rejects_missing_field() {
        let specs: Vec<FieldSpec> = STANDARD_FIELDS
            .iter()
            .copied()
            .filter(|s| s.field != SheetField::Brand)
            .collect();
        assert_eq!(
            SheetLayout::from_specs(&specs),
            Err(LayoutError::MissingField(SheetField::Brand))
        );
    }

    #[test]
    fn test_layout_rejects_duplicate_field() {
        let mut specs = STANDARD_FIELDS.to_vec();
        specs.push(FieldSpec {
            field: SheetField::Brand,
            cell: "H4",
            required: false,
        });
        assert_eq!(
            SheetLayout::from_specs(&specs),
            Err(LayoutError::DuplicateField(SheetField::Brand))
        );
    }

    #[test]
    fn test_layout_rejects_misaligned_rows() {
        let specs = specs_with(SheetField::Color, "E8");
        assert!(matches!(
            SheetLayout::from_specs(&specs),
            Err(LayoutError::MisalignedRows(_, _))
        ));
    }

    #[test]
    fn test_layout_rejects_rows_above_header() {
        let specs = specs_with(SheetField::InvoiceRef, "B9");
        assert!(matches!(
            SheetLayout::from_specs(&specs),
            Err(LayoutError::RowsOverlapHeader(_))
        ));
    }

    #[test]
    fn test_layout_requires_row_sentinel() {
        let specs: Vec<FieldSpec> = STANDARD_FIELDS
            .iter()
            .map(|s| FieldSpec {
                required: if s.field.is_row_field() { false } else { s.required },
                ..*s
            })
            .collect();
        assert_eq!(
            SheetLayout::from_specs(&specs),
            Err(LayoutError::NoRowSentinel)
        );
    }
}
