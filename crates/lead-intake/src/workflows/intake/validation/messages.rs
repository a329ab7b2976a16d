//! User-facing copy for the intake form.

use chrono::NaiveDate;

pub const FULL_NAME_REQUIRED: &str = "Ad Soyad alanı zorunludur.";
pub const PHONE_REQUIRED: &str = "Telefon Numarası alanı zorunludur.";
pub const PHONE_INVALID: &str = "Geçersiz telefon numarası, lütfen düzelterek tekrar deneyiniz.";
pub const BIRTH_DATE_REQUIRED: &str = "Doğum Tarihi alanı zorunludur.";
pub const BIRTH_DATE_INVALID: &str = "Doğum Tarihi geçerli bir tarih olmalıdır.";
pub const CUSTOMER_FLAG_REQUIRED: &str = "Akbank Müşterisi alanı doldurulmak zorundadır.";
pub const CUSTOMER_FLAG_INVALID: &str = "Akbank Müşterisi alanı geçerli bir değer olmalıdır.";
pub const NATIONAL_ID_REQUIRED: &str = "TC Kimlik Numarası alanı zorunludur.";
pub const NATIONAL_ID_DIGITS: &str = "TC Kimlik Numarası 11 haneli olmalıdır.";
pub const NATIONAL_ID_INVALID: &str = "TC Kimlik Numarası geçersizdir.";

pub const PHONE_DUPLICATE: &str =
    "Bu telefon numarasına sahip müşterinin başvurusu daha önce alınmıştır.";
pub const NATIONAL_ID_DUPLICATE: &str =
    "Bu TC Kimlik Numarasına sahip müşterinin başvurusu daha önce alınmıştır.";

pub const SUBMISSION_ACCEPTED: &str = "Ön onaylı ihtiyaç kredisi başvurunuz başarıyla alınmıştır. \
AKBANK Müşteri temsilcileri, kısa süre içerisinde sizinle bankamızda kayıtlı cep telefonu \
numaranızdan iletişime geçecektir.";
pub const SUBMISSION_FAILED: &str =
    "Başvuru oluşturulurken bir hata oluştu, lütfen daha sonra tekrar deneyiniz!";

pub fn full_name_too_short(min: usize) -> String {
    format!("Ad Soyad en az {min} karakter olmalıdır.")
}

pub fn full_name_too_long(max: usize) -> String {
    format!("Ad Soyad en fazla {max} karakter olmalıdır.")
}

pub fn birth_date_not_before(cutoff: NaiveDate) -> String {
    format!(
        "Doğum Tarihi {} tarihinden önce olmalıdır.",
        cutoff.format("%d.%m.%Y")
    )
}
