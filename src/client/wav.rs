use std::io;

use byteorder::{LittleEndian, WriteBytesExt};

const HEADER_LEN: usize = 44;
const BYTES_PER_SAMPLE: usize = 2;

/// Decoded audio, one `Vec` of samples in [-1, 1] per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Frames present in every channel.
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }
}

/// Encodes as a 16-bit PCM RIFF/WAVE file with interleaved channels.
pub fn encode_wav(buffer: &PcmBuffer) -> io::Result<Vec<u8>> {
    let channels = buffer.channels.len();
    let frames = buffer.frames();
    let data_len = frames * channels * BYTES_PER_SAMPLE;
    let block_align = channels * BYTES_PER_SAMPLE;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len);
    write_wav(&mut out, buffer, frames, data_len, block_align)?;
    Ok(out)
}

fn write_wav(
    out: &mut Vec<u8>,
    buffer: &PcmBuffer,
    frames: usize,
    data_len: usize,
    block_align: usize,
) -> io::Result<()> {
    let channels = buffer.channels.len();

    out.extend_from_slice(b"RIFF");
    out.write_u32::<LittleEndian>((36 + data_len) as u32)?;
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.write_u32::<LittleEndian>(16)?;
    out.write_u16::<LittleEndian>(1)?; // PCM
    out.write_u16::<LittleEndian>(channels as u16)?;
    out.write_u32::<LittleEndian>(buffer.sample_rate)?;
    out.write_u32::<LittleEndian>(buffer.sample_rate * block_align as u32)?;
    out.write_u16::<LittleEndian>(block_align as u16)?;
    out.write_u16::<LittleEndian>(16)?;

    out.extend_from_slice(b"data");
    out.write_u32::<LittleEndian>(data_len as u32)?;

    for frame in 0..frames {
        for channel in &buffer.channels {
            out.write_i16::<LittleEndian>(to_i16(channel[frame]))?;
        }
    }
    Ok(())
}

fn to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    #[test]
    fn header_describes_stereo_16bit() {
        let buffer = PcmBuffer {
            sample_rate: 44100,
            channels: vec![vec![0.0; 10], vec![0.0; 10]],
        };
        let wav = encode_wav(&buffer).unwrap();

        assert_eq!(wav.len(), 44 + 10 * 2 * 2);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(&wav[36..40], b"data");

        let mut cur = Cursor::new(&wav[4..8]);
        assert_eq!(cur.read_u32::<LittleEndian>().unwrap(), 36 + 40);

        let mut fmt = Cursor::new(&wav[20..36]);
        assert_eq!(fmt.read_u16::<LittleEndian>().unwrap(), 1);
        assert_eq!(fmt.read_u16::<LittleEndian>().unwrap(), 2);
        assert_eq!(fmt.read_u32::<LittleEndian>().unwrap(), 44100);
        assert_eq!(fmt.read_u32::<LittleEndian>().unwrap(), 44100 * 4);
        assert_eq!(fmt.read_u16::<LittleEndian>().unwrap(), 4);
        assert_eq!(fmt.read_u16::<LittleEndian>().unwrap(), 16);
    }

    #[test]
    fn samples_are_clamped_and_interleaved() {
        let buffer = PcmBuffer {
            sample_rate: 8000,
            channels: vec![vec![1.0, -1.0], vec![2.0, -3.0]],
        };
        let wav = encode_wav(&buffer).unwrap();
        let mut data = Cursor::new(&wav[44..]);
        let samples: Vec<i16> = (0..4)
            .map(|_| data.read_i16::<LittleEndian>().unwrap())
            .collect();
        assert_eq!(samples, vec![32767, 32767, -32768, -32768]);
    }

    #[test]
    fn ragged_channels_use_shortest() {
        let buffer = PcmBuffer {
            sample_rate: 8000,
            channels: vec![vec![0.5; 3], vec![0.5; 2]],
        };
        assert_eq!(encode_wav(&buffer).unwrap().len(), 44 + 2 * 2 * 2);
    }
}
