use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::Result;

/// Player Position (serverbound)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPositionPacket {
    pub x: f64,
    /// Feet position
    pub y: f64,
    pub z: f64,
    pub on_ground: bool,
}

impl PacketBody for PlayerPositionPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            x: buffer.read_f64()?,
            y: buffer.read_f64()?,
            z: buffer.read_f64()?,
            on_ground: buffer.read_bool()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_f64(self.x)?;
        buffer.write_f64(self.y)?;
        buffer.write_f64(self.z)?;
        buffer.write_bool(self.on_ground);
        Ok(())
    }
}

/// Player Position And Look (clientbound)
/// Updates the player's position on the server. This packet will also close the "Downloading Terrain" screen when joining/respawning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPositionAndLookPacket {
    /// Absolute or relative position, depending on Flags
    pub x: f64,
    /// Absolute or relative position, depending on Flags
    pub y: f64,
    /// Absolute or relative position, depending on Flags
    pub z: f64,
    /// Absolute or relative rotation on the X axis, in degrees
    pub yaw: f32,
    /// Absolute or relative rotation on the Y axis, in degrees
    pub pitch: f32,
    /// Bit field for relative/absolute positions and rotations
    pub flags: u8,
    /// Teleport ID for client confirmation
    pub teleport_id: i32,
}

impl PlayerPositionAndLookPacket {
    pub const RELATIVE_X: u8 = 0x01;
    pub const RELATIVE_Y: u8 = 0x02;
    pub const RELATIVE_Z: u8 = 0x04;
    pub const RELATIVE_Y_ROT: u8 = 0x08;
    pub const RELATIVE_X_ROT: u8 = 0x10;

    /// Absolute teleport with no rotation change.
    pub fn teleport(x: f64, y: f64, z: f64, teleport_id: i32) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
            flags: Self::RELATIVE_Y_ROT | Self::RELATIVE_X_ROT,
            teleport_id,
        }
    }
}

impl PacketBody for PlayerPositionAndLookPacket {
    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_f64(self.x)?;
        buffer.write_f64(self.y)?;
        buffer.write_f64(self.z)?;
        buffer.write_f32(self.yaw)?;
        buffer.write_f32(self.pitch)?;
        buffer.write_u8(self.flags);
        buffer.write_varint(self.teleport_id);
        Ok(())
    }
}
