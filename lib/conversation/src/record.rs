//! Employee records read from the store.

use crate::settings::VerificationSettings;

/// One employee's row, split into named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeRecord {
    pub id: String,
    pub phone: String,
    pub status: String,
    /// Every other column, left to right.
    pub extra: Vec<String>,
}

impl EmployeeRecord {
    /// Splits a row according to the sheet layout.
    ///
    /// Returns `None` if the row is too short to hold the ID, phone and
    /// status columns.
    #[must_use]
    pub fn from_row(cells: Vec<String>, settings: &VerificationSettings) -> Option<Self> {
        let named = [
            settings.id_column,
            settings.phone_column,
            settings.status_column,
        ];
        let cell = |column: u32| -> Option<String> {
            (column as usize)
                .checked_sub(1)
                .and_then(|index| cells.get(index))
                .cloned()
        };

        let id = cell(settings.id_column)?;
        let phone = cell(settings.phone_column)?;
        let status = cell(settings.status_column)?;

        let extra = cells
            .iter()
            .enumerate()
            .filter(|(index, _)| !named.contains(&(*index as u32 + 1)))
            .map(|(_, value)| value.clone())
            .collect();

        Some(Self {
            id,
            phone,
            status,
            extra,
        })
    }
}
