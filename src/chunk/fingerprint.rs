//! Отпечаток чанка
//!
//! Некриптографический 32-битный скользящий хеш по входным данным генерации.
//! Одинаковые входы всегда дают одинаковый идентификатор: на этом держатся
//! попадания в кэш и возобновление генерации после паузы.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Префикс идентификатора чанка
pub const CHUNK_ID_PREFIX: &str = "chunk_";

/// Идентификатор чанка (ключ кэша)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Строковое представление
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Восстановить идентификатор из строки (например, из имени файла кэша).
    ///
    /// Принимает только строки вида `chunk_` + 8 шестнадцатеричных цифр.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.strip_prefix(CHUNK_ID_PREFIX)?;
        if hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(value.to_string()))
        } else {
            None
        }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChunkId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Вычислить отпечаток чанка.
///
/// Поля разделяются `|`, чтобы сдвиг границы между провайдером и именем
/// говорящего не давал одинаковую строку. Времена округляются до миллисекунд.
pub fn fingerprint(provider: &str, speaker: &str, text: &str, start_time: f64, end_time: f64) -> ChunkId {
    let payload = format!(
        "{}|{}|{}|{:.3}|{:.3}",
        provider, speaker, text, start_time, end_time
    );
    ChunkId(format!("{}{:08x}", CHUNK_ID_PREFIX, rolling_hash(&payload)))
}

/// Скользящий хеш `h = h * 31 + c` по кодовым точкам, с переполнением
fn rolling_hash(payload: &str) -> u32 {
    payload
        .chars()
        .fold(0u32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_hash_known_values() {
        assert_eq!(rolling_hash(""), 0);
        assert_eq!(rolling_hash("a"), 97);
        assert_eq!(rolling_hash("ab"), 97 * 31 + 98);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint("openai", "A", "Hi there Welcome!", 1.0, 4.5);
        let b = fingerprint("openai", "A", "Hi there Welcome!", 1.0, 4.5);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with(CHUNK_ID_PREFIX));
        assert_eq!(a.as_str().len(), CHUNK_ID_PREFIX.len() + 8);
    }

    #[test]
    fn test_fingerprint_sensitive_to_inputs() {
        let base = fingerprint("openai", "A", "Hello", 1.0, 2.0);
        assert_ne!(base, fingerprint("elevenlabs", "A", "Hello", 1.0, 2.0));
        assert_ne!(base, fingerprint("openai", "B", "Hello", 1.0, 2.0));
        assert_ne!(base, fingerprint("openai", "A", "Hello!", 1.0, 2.0));
        assert_ne!(base, fingerprint("openai", "A", "Hello", 1.0, 2.5));
        assert_ne!(base, fingerprint("openai", "A", "Hello", 1.25, 2.0));
    }

    #[test]
    fn test_sub_millisecond_noise_ignored() {
        let a = fingerprint("p", "A", "x", 1.0, 2.0);
        let b = fingerprint("p", "A", "x", 1.0000001, 2.0000001);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_id_parse() {
        let id = fingerprint("p", "A", "x", 0.0, 1.0);
        assert_eq!(ChunkId::parse(id.as_str()), Some(id));
        assert_eq!(ChunkId::parse("chunk_xyz"), None);
        assert_eq!(ChunkId::parse("other_0000abcd"), None);
    }
}
