//! Readers for `Microsoft.Xna.Framework.Audio` and `.Media` content.
//!
//! Songs and videos only reference external media files; their payload is
//! a file name plus metadata. Sound effects embed the sample data.

use super::{Builtin, add};
use crate::content::{Asset, ContentReader, Record, Registry, Scalar, Sound, TypeName};
use crate::Result;

const SOUNDTRACK_TYPES: &[&str] = &["Music", "Dialog", "MusicAndDialog"];

pub(super) fn register(registry: &mut Registry) {
    add(
        registry,
        "SoundEffectReader",
        Builtin::reference("Microsoft.Xna.Framework.Audio.SoundEffect", read_sound_effect),
    );
    add(registry, "SongReader", Builtin::reference("Microsoft.Xna.Framework.Media.Song", read_song));
    add(registry, "VideoReader", Builtin::reference("Microsoft.Xna.Framework.Media.Video", read_video));
}

fn read_sound_effect(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    // WAVEFORMATEX, the body of a RIFF "fmt " chunk.
    let format = input.read_sized_bytes()?.to_vec();
    let data = input.read_sized_bytes()?.to_vec();
    Ok(Asset::Sound(Sound {
        format,
        data,
        loop_start: input.read_i32()?,
        loop_length: input.read_i32()?,
        duration_ms: input.read_i32()?,
    }))
}

fn read_song(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("Song")
        .with("file_name", input.read_string()?)
        .with("duration_ms", input.read_object()?)
        .into())
}

fn read_video(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let file_name = input.read_object()?;
    let duration = input.read_object()?;
    let width = input.read_object()?;
    let height = input.read_object()?;
    let fps = input.read_object()?;
    let soundtrack = match input.read_object()? {
        Asset::Scalar(Scalar::Int32(i)) => usize::try_from(i)
            .ok()
            .and_then(|i| SOUNDTRACK_TYPES.get(i))
            .map_or(Asset::from(i), |&name| Asset::from(name)),
        other => other,
    };
    Ok(Record::new("Video")
        .with("file_name", file_name)
        .with("duration_ms", duration)
        .with("width", width)
        .with("height", height)
        .with("frames_per_second", fps)
        .with("soundtrack_type", soundtrack)
        .into())
}
