//! Sliding-window behaviour of the audio stream buffer at the KWS geometry
//! (one second windows, half-second hops at 16 kHz).

mod common;

use common::{EventLog, RampAudio, HOP, WINDOW};
use kws_img::audio::{AudioDriver, AudioStreamBuffer, WavAudioConfig, WavAudioDriver};

fn ramp(n: usize) -> i16 {
    (n % 30000) as i16
}

fn slide(buffer: &mut AudioStreamBuffer, driver: &mut dyn AudioDriver) {
    buffer.wait_for_next_chunk(driver).unwrap();
    buffer.advance().unwrap();
    buffer.request_next(driver).unwrap();
}

#[test]
fn test_windows_overlap_by_window_minus_hop() {
    let mut driver = RampAudio::new(EventLog::default());
    let mut buffer = AudioStreamBuffer::new(WINDOW, HOP).unwrap();
    buffer.prime(&mut driver).unwrap();

    slide(&mut buffer, &mut driver);
    let mut previous = buffer.window().to_vec();
    assert!(previous[..WINDOW - HOP].iter().all(|&s| s == 0));

    for _ in 0..5 {
        slide(&mut buffer, &mut driver);
        let current = buffer.window();
        assert_eq!(&current[..WINDOW - HOP], &previous[HOP..]);
        previous = current.to_vec();
    }
}

#[test]
fn test_no_gap_or_duplicate_after_k_advances() {
    let mut driver = RampAudio::new(EventLog::default());
    let mut buffer = AudioStreamBuffer::new(WINDOW, HOP).unwrap();
    buffer.prime(&mut driver).unwrap();

    for k in 1..=6usize {
        slide(&mut buffer, &mut driver);
        let newest = k * HOP;
        let expected: Vec<i16> = (0..WINDOW)
            .map(|i| {
                let absolute = newest as i64 - WINDOW as i64 + i as i64;
                if absolute < 0 {
                    0
                } else {
                    ramp(absolute as usize)
                }
            })
            .collect();
        assert_eq!(buffer.window(), expected.as_slice(), "after {} advances", k);
    }
    assert_eq!(buffer.hops_consumed(), 6);
}

#[test]
fn test_wav_file_streams_through_window() {
    let samples: Vec<i16> = (0..4 * HOP).map(ramp).collect();
    let file = tempfile::NamedTempFile::new().unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(file.path(), spec).unwrap();
    for &s in &samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let mut driver = WavAudioDriver::open(file.path(), WavAudioConfig::default()).unwrap();
    driver.init(16000).unwrap();
    let mut buffer = AudioStreamBuffer::new(WINDOW, HOP).unwrap();
    buffer.prime(&mut driver).unwrap();

    slide(&mut buffer, &mut driver);
    slide(&mut buffer, &mut driver);
    assert_eq!(buffer.window(), &samples[..WINDOW]);

    slide(&mut buffer, &mut driver);
    slide(&mut buffer, &mut driver);
    assert_eq!(buffer.window(), &samples[2 * HOP..]);

    // file exhausted: the outstanding request cannot be served
    assert!(buffer.wait_for_next_chunk(&mut driver).is_err());
}
