//! Shared utility functions for the node-bridge core.

use regex::Regex;
use std::process::Command;
use std::sync::OnceLock;

/// Apply platform-specific flags to hide the console window on Windows.
/// On non-Windows platforms, this is a no-op.
#[cfg(target_os = "windows")]
pub fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(target_os = "windows"))]
pub fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    cmd
}

static SPACE_RUNS: OnceLock<Regex> = OnceLock::new();

/// 자식 프로세스의 HTML 섞인 에러 본문을 읽을 수 있는 평문으로 바꿉니다.
///
/// 고정된 엔티티 테이블과 태그 제거 휴리스틱만 사용합니다 — 전체 마크업
/// 파서가 아니며, 진단 메시지를 사람이 읽을 수 있게 만드는 용도입니다.
pub fn html_to_plain_text(html: &str) -> String {
    // <br> 계열은 개행으로
    let mut text = html
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("<br>", "\n");

    // 남은 태그 제거
    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }
    // &amp;는 마지막에 풀어야 이중 복원이 없습니다
    text = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    let spaces = SPACE_RUNS.get_or_init(|| Regex::new(" {2,}").unwrap());
    spaces.replace_all(&text, " ").trim().to_string()
}
