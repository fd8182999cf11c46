use std::io::{self, BufRead, IsTerminal, Write};

/// Prompt on stderr and read a line from stdin with echo suppressed.
///
/// When stdin is not a terminal the line is read as-is, so passphrases can
/// be piped in from scripts.
pub(crate) fn prompt_hidden(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    let result = read_line_no_echo();
    eprintln!();

    let mut line = result?;
    while matches!(line.chars().last(), Some('\n' | '\r')) {
        line.pop();
    }
    Ok(line)
}

fn read_plain() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[cfg(unix)]
fn read_line_no_echo() -> io::Result<String> {
    use std::os::fd::AsRawFd;

    if !io::stdin().is_terminal() {
        return read_plain();
    }

    let fd = io::stdin().as_raw_fd();
    let saved = set_echo(fd, false)?;
    let result = read_plain();
    // Echo must come back even when the read failed.
    let restored = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &saved) };
    if restored != 0 && result.is_ok() {
        return Err(io::Error::last_os_error());
    }
    result
}

/// Flip the terminal's ECHO flag, returning the attributes to restore.
#[cfg(unix)]
fn set_echo(fd: i32, on: bool) -> io::Result<libc::termios> {
    let mut attrs = unsafe { std::mem::zeroed::<libc::termios>() };
    if unsafe { libc::tcgetattr(fd, &mut attrs) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let saved = attrs;
    if on {
        attrs.c_lflag |= libc::ECHO;
    } else {
        attrs.c_lflag &= !libc::ECHO;
    }
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &attrs) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(saved)
}

#[cfg(not(unix))]
fn read_line_no_echo() -> io::Result<String> {
    read_plain()
}
