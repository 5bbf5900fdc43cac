//! User-facing replies.
//!
//! Defaults are the bot's Arabic texts. Every text can be replaced through
//! configuration; the summary keeps its four-line shape either way.

use crate::error::VerificationError;
use crate::record::EmployeeRecord;
use serde::Deserialize;

/// The reply catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Sent on `/start`.
    pub ask_for_id: String,
    /// Sent when the ID matched a record.
    pub ask_for_phone: String,
    pub id_not_found: String,
    pub phone_mismatch: String,
    /// Sent when the status does not grant access.
    pub contact_administrator: String,
    /// Sent for any store or internal failure.
    pub system_error: String,
    pub cancelled: String,
    pub summary_title: String,
    pub id_label: String,
    pub phone_label: String,
    pub status_label: String,
    pub extra_label: String,
    /// Stands in for the extra fields when a record has none.
    pub no_extra_fields: String,
    /// Joins extra fields.
    pub extra_separator: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            ask_for_id: "مرحباً! 👋 الرجاء إرسال رقم الهوية الخاص بك:".to_string(),
            ask_for_phone: "✅ تم العثور على الرقم. الرجاء إرسال رقم هاتفك:".to_string(),
            id_not_found: "❌ رقم الهوية غير موجود في النظام.".to_string(),
            phone_mismatch: "❌ رقم الهاتف غير مطابق".to_string(),
            contact_administrator: "❌ عفواً راجع المسؤول الإداري".to_string(),
            system_error: "⚠️ حدث خطأ في النظام. الرجاء المحاولة لاحقاً.".to_string(),
            cancelled: "تم إلغاء العملية.".to_string(),
            summary_title: "📋 **بيانات الموظف:**".to_string(),
            id_label: "🆔 **رقم الهوية:**".to_string(),
            phone_label: "📞 **رقم الهاتف:**".to_string(),
            status_label: "✅ **الحالة:**".to_string(),
            extra_label: "📊 **بيانات إضافية:**".to_string(),
            no_extra_fields: "لا توجد".to_string(),
            extra_separator: ", ".to_string(),
        }
    }
}

impl Messages {
    /// Reply for a failed verification.
    #[must_use]
    pub fn failure(&self, error: &VerificationError) -> &str {
        match error {
            VerificationError::RecordNotFound => &self.id_not_found,
            VerificationError::FieldMismatch => &self.phone_mismatch,
            VerificationError::AccessDenied => &self.contact_administrator,
            VerificationError::SystemError { .. } => &self.system_error,
        }
    }

    /// Formats a verified employee's record.
    #[must_use]
    pub fn summary(&self, record: &EmployeeRecord) -> String {
        let extra = if record.extra.is_empty() {
            self.no_extra_fields.clone()
        } else {
            record.extra.join(&self.extra_separator)
        };

        format!(
            "{}\n\n{} {}\n{} {}\n{} {}\n{} {}",
            self.summary_title,
            self.id_label,
            record.id,
            self.phone_label,
            record.phone,
            self.status_label,
            record.status,
            self.extra_label,
            extra,
        )
    }
}
