//! Bilingual message catalog
//!
//! Every rejection the engine produces is composed here, in both languages.
//! The boundary never fabricates its own error text for field-level
//! failures, so this module is the single place the two-language contract
//! lives.

use crate::schema::Language;

/// Required-field message. The label substitution contract: the caller
/// passes the field label already resolved for the requested language.
pub fn required(label: &str, language: Language) -> String {
    match language {
        Language::Ar => format!("{label} مطلوب"),
        Language::En => format!("{label} is required"),
    }
}

pub fn invalid_text(language: Language) -> String {
    match language {
        Language::Ar => "قيمة نصية غير صالحة".to_string(),
        Language::En => "Invalid text value".to_string(),
    }
}

/// Generic fallback when a regex mismatch has no configured message.
pub fn invalid_format(language: Language) -> String {
    match language {
        Language::Ar => "صيغة غير صالحة".to_string(),
        Language::En => "Invalid format".to_string(),
    }
}

pub fn min_length(min: u32, language: Language) -> String {
    match language {
        Language::Ar => format!("الحد الأدنى للطول هو {min}"),
        Language::En => format!("Minimum length is {min}"),
    }
}

pub fn max_length(max: u32, language: Language) -> String {
    match language {
        Language::Ar => format!("الحد الأقصى للطول هو {max}"),
        Language::En => format!("Maximum length is {max}"),
    }
}

pub fn invalid_date(language: Language) -> String {
    match language {
        Language::Ar => "تاريخ غير صالح".to_string(),
        Language::En => "Invalid date".to_string(),
    }
}

pub fn invalid_choice(language: Language) -> String {
    match language {
        Language::Ar => "اختيار غير صالح".to_string(),
        Language::En => "Invalid choice".to_string(),
    }
}

/// Slot already claimed for this form instance.
pub fn slot_taken(language: Language) -> String {
    match language {
        Language::Ar => "هذا الرقم محجوز بالفعل. يرجى اختيار رقم آخر.".to_string(),
        Language::En => "This slot is already taken. Please choose another.".to_string(),
    }
}

/// Slot reservation is enabled but the payload carries no slot number.
pub fn slot_required(language: Language) -> String {
    match language {
        Language::Ar => "رقم المقعد مطلوب".to_string(),
        Language::En => "A slot number is required".to_string(),
    }
}

/// The submitted slot number is not one the template offers.
pub fn slot_not_offered(language: Language) -> String {
    match language {
        Language::Ar => "رقم المقعد غير متاح".to_string(),
        Language::En => "This slot number is not available".to_string(),
    }
}
