#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("invalid world bounds: {count_x}x{count_z} sectors of width {width}")]
    InvalidBounds {
        count_x: u32,
        count_z: u32,
        width: f32,
    },

    #[error("more than one region with id {0}")]
    DuplicateRegionId(u16),

    #[error("region id {0} exceeds the region table capacity")]
    RegionIdOutOfRange(u16),

    #[error("no region at static npc position ({name})")]
    NoRegionAtNpcPosition { name: String },

    #[error("character {0} is not placed in the world")]
    NotPlaced(entities::CharacterId),
}
