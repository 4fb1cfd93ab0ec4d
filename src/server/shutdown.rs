//! 호스트 종료 시 자식 정리 — atexit 기반 best-effort 훅
//!
//! 호스트 프로세스가 정상 종료할 때 우리가 띄운 자식들에게 종료 신호를
//! 보냅니다. 강제 종료(kill -9)나 크래시 경로까지는 책임지지 않습니다.

use std::sync::{Mutex, Once};

static KILL_LIST: Mutex<Vec<u32>> = Mutex::new(Vec::new());
static HOOK: Once = Once::new();

/// 종료 시 함께 정리할 자식 PID를 등록합니다. 최초 호출에서 atexit 훅을 겁니다.
pub(crate) fn register(pid: u32) {
    HOOK.call_once(install_hook);
    if let Ok(mut list) = KILL_LIST.lock() {
        list.push(pid);
    }
}

#[cfg(unix)]
fn install_hook() {
    unsafe {
        libc::atexit(terminate_all);
    }
}

// Windows에는 CRT atexit 바인딩이 없습니다 — stop() 경로의 taskkill만 사용
#[cfg(windows)]
fn install_hook() {}

/// 이미 직접 정리한 PID를 목록에서 뺍니다.
pub(crate) fn unregister(pid: u32) {
    if let Ok(mut list) = KILL_LIST.lock() {
        list.retain(|&p| p != pid);
    }
}

#[cfg(unix)]
extern "C" fn terminate_all() {
    let pids: Vec<u32> = match KILL_LIST.lock() {
        Ok(mut list) => list.drain(..).collect(),
        Err(_) => return,
    };
    for pid in pids {
        terminate(pid);
    }
}

/// PID로 종료 신호를 보냅니다. 전달만 보장하고, 종료 대기는 하지 않습니다.
pub(crate) fn terminate(pid: u32) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        let _ = std::process::Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .creation_flags(CREATE_NO_WINDOW)
            .output();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        register(999_999_001);
        register(999_999_002);
        unregister(999_999_001);

        let list = KILL_LIST.lock().unwrap();
        assert!(!list.contains(&999_999_001));
        assert!(list.contains(&999_999_002));
        drop(list);
        unregister(999_999_002);
    }
}
