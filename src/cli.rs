use crate::warn;

/// How Windows asked us to run. Screensaver arguments look like `/s`,
/// `/c:1234` or `/p 1234`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Show,
    Configure { parent: Option<isize> },
    Preview { parent: Option<isize> },
}

impl Invocation {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::parse(&args)
    }

    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let Some(first) = args.first().map(|a| a.as_ref().trim()) else {
            return Self::Show;
        };

        let flag = first.trim_start_matches(['/', '-']);
        let (switch, inline_handle) = match flag.split_once(':') {
            Some((switch, handle)) => (switch, Some(handle)),
            None => (flag, None),
        };

        let parent = inline_handle
            .or_else(|| args.get(1).map(|a| a.as_ref()))
            .and_then(|h| h.trim().parse::<isize>().ok());

        match switch.to_ascii_lowercase().as_str() {
            "s" => Self::Show,
            "c" => Self::Configure { parent },
            "p" => Self::Preview { parent },
            other => {
                warn!("[SCREENSAVER] Unknown argument '{}', running full screen", other);
                Self::Show
            }
        }
    }
}
