use line_messaging_module::ReplyMessage;

use crate::records::EmployeeProfile;

/// Shown when a profile has no photo.
pub const IMAGE_FALLBACK_URL: &str = "https://placehold.co/1200x780";

pub const UNBOUND_PROMPT_TEXT: &str =
    "บัญชียังไม่ได้ผูกกับรหัสพนักงาน กรุณาส่งรหัสพนักงาน (ตัวเลข 4-8 หลัก) เพื่อเริ่มต้น";

pub const PROFILE_NOT_FOUND_TEXT: &str = "ไม่พบข้อมูลพนักงานที่ผูกกับรหัสของคุณในระบบหลัก";

pub const NOTE_RECEIVED_TEXT: &str = "ได้รับคำขอแก้ไขข้อมูลของคุณแล้ว (บันทึกใน Firebase)";

pub fn bind_success(code: &str) -> ReplyMessage {
    ReplyMessage::text(format!(
        "ผูกบัญชีสำเร็จ! รหัสพนักงาน {} ถูกบันทึกแล้ว",
        code
    ))
}

pub fn unbound_prompt() -> ReplyMessage {
    ReplyMessage::text(UNBOUND_PROMPT_TEXT)
}

pub fn profile_not_found() -> ReplyMessage {
    ReplyMessage::text(PROFILE_NOT_FOUND_TEXT)
}

pub fn note_received() -> ReplyMessage {
    ReplyMessage::text(NOTE_RECEIVED_TEXT)
}

pub fn profile_summary(profile: &EmployeeProfile) -> ReplyMessage {
    ReplyMessage::text(format!(
        "[Employee Profile]\nชื่อ: {}\nรหัส: {}\nฝ่าย: {}\nStatus: {}\n\nSafety Record: {}",
        profile.name, profile.emp_id, profile.department, profile.status, profile.safety_record
    ))
}

pub fn profile_image(profile: &EmployeeProfile) -> ReplyMessage {
    ReplyMessage::image(
        profile
            .photo_url
            .as_deref()
            .unwrap_or(IMAGE_FALLBACK_URL),
    )
}
