use anyhow::{Context, Result};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse a seed given in decimal or as `0x`-prefixed hex.
pub fn parse_seed(token: &str) -> Result<u64> {
    let token = token.trim();
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex seed `{token}`"))
    } else {
        token
            .parse()
            .with_context(|| format!("invalid seed `{token}`"))
    }
}

pub fn parse_seeds(csv: &str) -> Result<Vec<u64>> {
    split_csv(csv).iter().map(|t| parse_seed(t)).collect()
}
