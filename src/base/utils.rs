fn read_float_and_factor_from_env(var: &str) -> Option<(f64, usize)> {
    let value = std::env::var(var).ok()?;
    let value = value.trim();

    let value = match value.strip_suffix(|c| c == 'b' || c == 'B') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => value,
    };

    let (digits, factor) = match value.chars().last()? {
        'g' | 'G' => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        'm' | 'M' => (&value[..value.len() - 1], 1024 * 1024),
        'k' | 'K' => (&value[..value.len() - 1], 1024),
        _ => (value, 1),
    };

    match digits.parse::<f64>() {
        Ok(x) if x.is_finite() => Some((x, factor)),
        _ => None,
    }
}

/// Reads an unsigned count from the environment. `k`, `m` and `g` suffixes
/// scale the value by powers of 1024, so `GC_MARK_STACK_LIMIT=64k` works.
/// Values that do not fit a `usize` read as absent.
pub fn read_uint_from_env(var: &str) -> Option<usize> {
    let (value, factor) = read_float_and_factor_from_env(var)?;

    if value < 0.0 || value >= usize::MAX as f64 {
        return None;
    }

    (value as usize).checked_mul(factor)
}

pub fn read_string_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

pub fn read_bool_from_env(var: &str) -> Option<bool> {
    match read_string_from_env(var)?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub struct FormattedSize {
    pub size: f64,
}

impl std::fmt::Display for FormattedSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let ksize = self.size / 1024f64;

        if ksize < 1f64 {
            return write!(f, "{}B", self.size);
        }

        let msize = ksize / 1024f64;

        if msize < 1f64 {
            return write!(f, "{:.1}K", ksize);
        }

        let gsize = msize / 1024f64;

        if gsize < 8f64 {
            write!(f, "{:.1}M", msize)
        } else {
            write!(f, "{:.1}G", gsize)
        }
    }
}

impl std::fmt::Debug for FormattedSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

pub fn formatted_size(size: usize) -> FormattedSize {
    FormattedSize { size: size as f64 }
}
