//! Аудиобуфер PCM
//!
//! Семплы f32 в диапазоне [-1.0, 1.0], каналы чередуются (interleaved).
//! Кодирование в WAV/PCM-контейнеры выполняется снаружи.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DubSyncError, Result};

/// Аудиобуфер с частотой дискретизации и числом каналов
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Семплы, каналы чередуются
    pub samples: Vec<f32>,
    /// Частота дискретизации (например, 24000, 44100)
    pub sample_rate: u32,
    /// Количество каналов
    pub channels: u16,
}

impl AudioBuffer {
    /// Создать буфер из чередующихся семплов
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Моно-буфер
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Тишина заданной длины в кадрах
    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self::new(vec![0.0; frames * channels as usize], sample_rate, channels)
    }

    /// Собрать буфер из отдельных каналов.
    ///
    /// Каналы разной длины выравниваются по самому короткому.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let count = channels.len();
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * count);
        for frame in 0..frames {
            for channel in &channels {
                samples.push(channel[frame]);
            }
        }
        Self::new(samples, sample_rate, count as u16)
    }

    /// Разделить на отдельные каналы
    pub fn to_channels(&self) -> Vec<Vec<f32>> {
        let count = self.channels.max(1) as usize;
        let mut channels = vec![Vec::with_capacity(self.frames()); count];
        for frame in self.samples.chunks_exact(count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        channels
    }

    /// Количество кадров (семплов на канал)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Длительность в секундах
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Проверить формат буфера
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(DubSyncError::InvalidFormat("sample rate must be positive".to_string()));
        }
        if self.channels == 0 {
            return Err(DubSyncError::InvalidFormat("channel count must be positive".to_string()));
        }
        if self.samples.len() % self.channels as usize != 0 {
            return Err(DubSyncError::InvalidFormat(format!(
                "{} samples do not divide into {} channels",
                self.samples.len(),
                self.channels
            )));
        }
        Ok(())
    }

    /// Пиковая амплитуда
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, &s| peak.max(s.abs()))
    }

    /// Среднеквадратичное значение
    pub fn rms(&self) -> f32 {
        compute_rms(&self.samples)
    }

    /// Ограничить семплы диапазоном [-1.0, 1.0] перед кодированием в целочисленный PCM
    pub fn clamp_in_place(&mut self) {
        for sample in &mut self.samples {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Масштабировать весь буфер так, чтобы пик не превышал `ceiling`.
    ///
    /// Возвращает применённый коэффициент (1.0, если пик уже ниже 1.0).
    pub fn limit_peak(&mut self, ceiling: f32) -> f32 {
        let peak = self.peak();
        if peak <= 1.0 {
            return 1.0;
        }
        let factor = ceiling / peak;
        for sample in &mut self.samples {
            *sample *= factor;
        }
        factor
    }

    /// Семплы в виде little-endian f32 байтов
    pub fn to_le_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.samples.len() * 4);
        for &sample in &self.samples {
            buf.put_f32_le(sample);
        }
        buf.freeze()
    }

    /// Восстановить буфер из little-endian f32 байтов
    pub fn from_le_bytes(mut data: &[u8], sample_rate: u32, channels: u16) -> Result<Self> {
        if data.len() % 4 != 0 {
            return Err(DubSyncError::InvalidFormat(format!(
                "PCM blob length {} is not a multiple of 4",
                data.len()
            )));
        }
        let mut samples = Vec::with_capacity(data.len() / 4);
        while data.has_remaining() {
            samples.push(data.get_f32_le());
        }
        let buffer = Self::new(samples, sample_rate, channels);
        buffer.validate()?;
        Ok(buffer)
    }
}

/// Вычисляет RMS семплов
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_interleave() {
        let buffer = AudioBuffer::from_channels(vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]], 8000);

        assert_eq!(buffer.channels, 2);
        assert_eq!(buffer.samples, vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.to_channels()[1], vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::silence(44100, 44100, 2);
        assert_eq!(buffer.samples.len(), 88200);
        assert_eq!(buffer.duration(), 1.0);
    }

    #[test]
    fn test_limit_peak() {
        let mut buffer = AudioBuffer::mono(vec![0.5, -2.0, 1.0], 8000);
        let factor = buffer.limit_peak(0.95);

        assert!((factor - 0.475).abs() < 1e-6);
        assert!((buffer.peak() - 0.95).abs() < 1e-6);

        let mut quiet = AudioBuffer::mono(vec![0.5, -0.2], 8000);
        assert_eq!(quiet.limit_peak(0.95), 1.0);
        assert_eq!(quiet.samples, vec![0.5, -0.2]);
    }

    #[test]
    fn test_clamp() {
        let mut buffer = AudioBuffer::mono(vec![1.5, -1.5, 0.25], 8000);
        buffer.clamp_in_place();
        assert_eq!(buffer.samples, vec![1.0, -1.0, 0.25]);
    }

    #[test]
    fn test_bytes_restore() {
        let buffer = AudioBuffer::new(vec![0.25, -0.5, 1.0, 0.0], 22050, 2);
        let bytes = buffer.to_le_bytes();
        assert_eq!(bytes.len(), 16);

        let restored = AudioBuffer::from_le_bytes(&bytes, 22050, 2).unwrap();
        assert_eq!(restored, buffer);
        assert!(AudioBuffer::from_le_bytes(&bytes[..15], 22050, 2).is_err());
        assert!(AudioBuffer::from_le_bytes(&bytes[..12], 22050, 2).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(AudioBuffer::mono(vec![0.0], 0).validate().is_err());
        assert!(AudioBuffer::new(vec![0.0; 3], 8000, 2).validate().is_err());
        assert!(AudioBuffer::new(vec![0.0; 4], 8000, 2).validate().is_ok());
    }
}
