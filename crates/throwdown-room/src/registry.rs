//! The set of live rooms, indexed by code and by connection.

use std::collections::HashMap;

use throwdown_protocol::RoomCode;
use throwdown_transport::ConnectionId;

use crate::{CodeGenerator, MatchConfig, Participant, Room, RoomError};

/// Owns every live [`Room`].
///
/// Keeps a reverse index from connection to room code so a connection can
/// be in at most one room, and so a disconnect can find its room in O(1).
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    memberships: HashMap<ConnectionId, RoomCode>,
    codes: Box<dyn CodeGenerator>,
    code_length: usize,
    max_code_attempts: u32,
    next_serial: u64,
}

impl RoomRegistry {
    pub fn new(codes: Box<dyn CodeGenerator>, config: &MatchConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            codes,
            code_length: config.code_length,
            max_code_attempts: config.max_code_attempts,
            next_serial: 1,
        }
    }

    /// Opens a room with `player1` seated and the second seat empty.
    pub fn create_room(&mut self, player1: Participant) -> Result<RoomCode, RoomError> {
        self.ensure_unseated(&player1)?;
        let code = self.allocate_code()?;
        let serial = self.next_serial();
        self.insert(Room::open(code.clone(), serial, player1));
        Ok(code)
    }

    /// Opens a room with both seats taken.
    pub fn create_match(
        &mut self,
        player1: Participant,
        player2: Participant,
    ) -> Result<RoomCode, RoomError> {
        self.ensure_unseated(&player1)?;
        self.ensure_unseated(&player2)?;
        let code = self.allocate_code()?;
        let serial = self.next_serial();
        self.insert(Room::full(code.clone(), serial, player1, player2));
        Ok(code)
    }

    /// Seats `player2` in the room with `code`.
    ///
    /// Fails without touching anything if the room is missing or full.
    pub fn seat(&mut self, code: &RoomCode, player2: Participant) -> Result<(), RoomError> {
        self.ensure_unseated(&player2)?;
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let conn = player2.id();
        room.seat_opponent(player2)?;
        self.memberships.insert(conn, code.clone());
        Ok(())
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// The code of the room `conn` sits in.
    pub fn room_of(&self, conn: ConnectionId) -> Option<RoomCode> {
        self.memberships.get(&conn).cloned()
    }

    /// Removes a room and forgets its members. Removing twice is a no-op.
    pub fn remove(&mut self, code: &RoomCode) -> Option<Room> {
        let room = self.rooms.remove(code)?;
        for (_, participant) in room.participants() {
            self.memberships.remove(&participant.id());
        }
        Some(room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn ensure_unseated(&self, player: &Participant) -> Result<(), RoomError> {
        match self.memberships.get(&player.id()) {
            Some(code) => Err(RoomError::AlreadyInRoom(player.id(), code.clone())),
            None => Ok(()),
        }
    }

    fn allocate_code(&mut self) -> Result<RoomCode, RoomError> {
        for attempt in 1..=self.max_code_attempts {
            let code = self.codes.generate(self.code_length);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
            tracing::debug!(%code, attempt, "room code collision, regenerating");
        }
        Err(RoomError::CodesExhausted {
            attempts: self.max_code_attempts,
        })
    }

    fn next_serial(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    fn insert(&mut self, room: Room) {
        for (_, participant) in room.participants() {
            self.memberships.insert(participant.id(), room.code().clone());
        }
        self.rooms.insert(room.code().clone(), room);
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.rooms.len())
            .field("memberships", &self.memberships.len())
            .field("next_serial", &self.next_serial)
            .finish()
    }
}
