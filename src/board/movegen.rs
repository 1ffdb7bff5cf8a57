//! Pseudo-legal and legal move generation, check detection, and perft.

use super::attack_tables::{slider_attacks, KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};
use super::types::bitboard::pop_lsb;
use super::{Bitboard, Board, Color, Move, MoveList, Piece, Square};

#[derive(Clone, Copy)]
enum Slider {
    Bishop,
    Rook,
    Queen,
}

impl Board {
    pub(crate) fn mobility_counts(&self) -> (i32, i32) {
        let pieces = [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen];
        let mut counts = [0i32; 2];

        for color in [Color::White, Color::Black] {
            let c_idx = color.index();
            let mut count = 0;
            for &piece in &pieces {
                for from in self.pieces[c_idx][piece.index()].iter() {
                    count += self.generate_piece_moves(from, piece).len() as i32;
                }
            }
            counts[c_idx] = count;
        }

        (counts[0], counts[1])
    }

    fn create_move(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
        is_castling: bool,
        is_en_passant: bool,
    ) -> Move {
        if is_castling {
            return if to.file() > from.file() {
                Move::castle_kingside(from, to)
            } else {
                Move::castle_queenside(from, to)
            };
        }
        if is_en_passant {
            return Move::en_passant(from, to);
        }

        let is_capture = self.piece_at(to).is_some();
        match (promotion, is_capture) {
            (Some(p), true) => Move::new_promotion_capture(from, to, p),
            (Some(p), false) => Move::new_promotion(from, to, p),
            (None, true) => Move::capture(from, to),
            (None, false) => Move::quiet(from, to),
        }
    }

    fn generate_pawn_moves(&self, from: Square) -> MoveList {
        let color = self.current_color();
        let mut moves = MoveList::new();

        let Some(forward_sq) = from.forward(color == Color::White) else {
            return moves;
        };
        let promotion_rank = if color == Color::White { 7 } else { 0 };
        let start_rank = if color == Color::White { 1 } else { 6 };

        if self.is_empty(forward_sq) {
            if forward_sq.rank() == promotion_rank {
                for promo in super::PROMOTION_PIECES {
                    moves.push(self.create_move(from, forward_sq, Some(promo), false, false));
                }
            } else {
                moves.push(self.create_move(from, forward_sq, None, false, false));
                if from.rank() == start_rank {
                    if let Some(double_sq) = forward_sq.forward(color == Color::White) {
                        if self.is_empty(double_sq) {
                            moves.push(Move::double_pawn_push(from, double_sq));
                        }
                    }
                }
            }
        }

        let file = from.file() as isize;
        for df in [-1isize, 1] {
            let capture_file = file + df;
            if !(0..8).contains(&capture_file) {
                continue;
            }
            let target_sq = Square::new(forward_sq.rank(), capture_file as usize);
            if let Some((target_color, _)) = self.piece_at(target_sq) {
                if target_color != color {
                    if target_sq.rank() == promotion_rank {
                        for promo in super::PROMOTION_PIECES {
                            moves.push(self.create_move(
                                from,
                                target_sq,
                                Some(promo),
                                false,
                                false,
                            ));
                        }
                    } else {
                        moves.push(self.create_move(from, target_sq, None, false, false));
                    }
                }
            } else if Some(target_sq) == self.en_passant_target {
                moves.push(self.create_move(from, target_sq, None, false, true));
            }
        }

        moves
    }

    fn generate_pawn_tactical_moves(&self, from: Square, moves: &mut MoveList) {
        let color = self.current_color();
        let Some(forward_sq) = from.forward(color == Color::White) else {
            return;
        };
        let promotion_rank = if color == Color::White { 7 } else { 0 };

        if forward_sq.rank() == promotion_rank && self.is_empty(forward_sq) {
            for promo in super::PROMOTION_PIECES {
                moves.push(self.create_move(from, forward_sq, Some(promo), false, false));
            }
        }

        let file = from.file() as isize;
        for df in [-1isize, 1] {
            let capture_file = file + df;
            if !(0..8).contains(&capture_file) {
                continue;
            }
            let target_sq = Square::new(forward_sq.rank(), capture_file as usize);
            if let Some((target_color, _)) = self.piece_at(target_sq) {
                if target_color != color {
                    if target_sq.rank() == promotion_rank {
                        for promo in super::PROMOTION_PIECES {
                            moves.push(self.create_move(
                                from,
                                target_sq,
                                Some(promo),
                                false,
                                false,
                            ));
                        }
                    } else {
                        moves.push(self.create_move(from, target_sq, None, false, false));
                    }
                }
            } else if Some(target_sq) == self.en_passant_target {
                moves.push(self.create_move(from, target_sq, None, false, true));
            }
        }
    }

    fn generate_knight_moves(&self, from: Square) -> MoveList {
        let mut moves = MoveList::new();
        let color = self.current_color();
        let own_occ = self.occupied[color.index()].0;
        let mut targets = Bitboard(KNIGHT_ATTACKS[from.index()] & !own_occ);

        while targets.0 != 0 {
            let to_sq = pop_lsb(&mut targets);
            moves.push(self.create_move(from, to_sq, None, false, false));
        }
        moves
    }

    fn generate_king_moves(&self, from: Square) -> MoveList {
        let mut moves = MoveList::new();
        let color = self.current_color();
        let back_rank = if color == Color::White { 0 } else { 7 };
        let own_occ = self.occupied[color.index()].0;
        let mut targets = Bitboard(KING_ATTACKS[from.index()] & !own_occ);

        while targets.0 != 0 {
            let to_sq = pop_lsb(&mut targets);
            moves.push(self.create_move(from, to_sq, None, false, false));
        }

        if from == Square::new(back_rank, 4) {
            if self.has_castling_right(color, 'K')
                && self.is_empty(Square::new(back_rank, 5))
                && self.is_empty(Square::new(back_rank, 6))
                && self.piece_at(Square::new(back_rank, 7)) == Some((color, Piece::Rook))
            {
                moves.push(self.create_move(from, Square::new(back_rank, 6), None, true, false));
            }
            if self.has_castling_right(color, 'Q')
                && self.is_empty(Square::new(back_rank, 1))
                && self.is_empty(Square::new(back_rank, 2))
                && self.is_empty(Square::new(back_rank, 3))
                && self.piece_at(Square::new(back_rank, 0)) == Some((color, Piece::Rook))
            {
                moves.push(self.create_move(from, Square::new(back_rank, 2), None, true, false));
            }
        }

        moves
    }

    fn generate_slider_moves(&self, from: Square, slider: Slider) -> MoveList {
        let mut moves = MoveList::new();
        let color = self.current_color();
        let own_occ = self.occupied[color.index()].0;

        let targets_raw = match slider {
            Slider::Bishop => slider_attacks(from.index(), self.all_occupied.0, true),
            Slider::Rook => slider_attacks(from.index(), self.all_occupied.0, false),
            Slider::Queen => {
                slider_attacks(from.index(), self.all_occupied.0, false)
                    | slider_attacks(from.index(), self.all_occupied.0, true)
            }
        } & !own_occ;

        for to_sq in Bitboard(targets_raw).iter() {
            moves.push(self.create_move(from, to_sq, None, false, false));
        }
        moves
    }

    fn generate_piece_moves(&self, from: Square, piece: Piece) -> MoveList {
        match piece {
            Piece::Pawn => self.generate_pawn_moves(from),
            Piece::Knight => self.generate_knight_moves(from),
            Piece::Bishop => self.generate_slider_moves(from, Slider::Bishop),
            Piece::Rook => self.generate_slider_moves(from, Slider::Rook),
            Piece::Queen => self.generate_slider_moves(from, Slider::Queen),
            Piece::King => self.generate_king_moves(from),
        }
    }

    fn generate_pseudo_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        let c_idx = self.current_color().index();

        for piece in [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ] {
            for from in self.pieces[c_idx][piece.index()].iter() {
                for m in self.generate_piece_moves(from, piece).iter() {
                    moves.push(*m);
                }
            }
        }
        moves
    }

    pub(crate) fn find_king(&self, color: Color) -> Option<Square> {
        self.pieces[color.index()][Piece::King.index()].iter().next()
    }

    pub(crate) fn is_square_attacked(&self, square: Square, attacker_color: Color) -> bool {
        let target_idx = square.index();
        let c_idx = attacker_color.index();

        let pawn_sources = PAWN_ATTACKS[attacker_color.opponent().index()][target_idx];
        if self.pieces[c_idx][Piece::Pawn.index()].0 & pawn_sources != 0 {
            return true;
        }

        if self.pieces[c_idx][Piece::Knight.index()].0 & KNIGHT_ATTACKS[target_idx] != 0 {
            return true;
        }

        if self.pieces[c_idx][Piece::King.index()].0 & KING_ATTACKS[target_idx] != 0 {
            return true;
        }

        let rook_like = self.pieces[c_idx][Piece::Rook.index()].0
            | self.pieces[c_idx][Piece::Queen.index()].0;
        let bishop_like = self.pieces[c_idx][Piece::Bishop.index()].0
            | self.pieces[c_idx][Piece::Queen.index()].0;

        if slider_attacks(target_idx, self.all_occupied.0, false) & rook_like != 0 {
            return true;
        }
        if slider_attacks(target_idx, self.all_occupied.0, true) & bishop_like != 0 {
            return true;
        }

        false
    }

    pub(crate) fn is_in_check(&self, color: Color) -> bool {
        match self.find_king(color) {
            Some(king_sq) => self.is_square_attacked(king_sq, color.opponent()),
            None => false,
        }
    }

    /// All `attacker_color` pieces attacking `square`, as a bitboard.
    pub(crate) fn attackers_to_square(&self, square: Square, attacker_color: Color) -> Bitboard {
        let target_idx = square.index();
        let c_idx = attacker_color.index();
        let mut attackers = 0u64;

        attackers |= self.pieces[c_idx][Piece::Pawn.index()].0
            & PAWN_ATTACKS[attacker_color.opponent().index()][target_idx];
        attackers |= self.pieces[c_idx][Piece::Knight.index()].0 & KNIGHT_ATTACKS[target_idx];
        attackers |= self.pieces[c_idx][Piece::King.index()].0 & KING_ATTACKS[target_idx];

        let rook_like = self.pieces[c_idx][Piece::Rook.index()].0
            | self.pieces[c_idx][Piece::Queen.index()].0;
        let bishop_like = self.pieces[c_idx][Piece::Bishop.index()].0
            | self.pieces[c_idx][Piece::Queen.index()].0;
        attackers |= slider_attacks(target_idx, self.all_occupied.0, false) & rook_like;
        attackers |= slider_attacks(target_idx, self.all_occupied.0, true) & bishop_like;

        Bitboard(attackers)
    }

    /// Bitboard of opponent pieces currently checking `color`'s king.
    pub(crate) fn checkers_for(&self, color: Color) -> Bitboard {
        match self.find_king(color) {
            Some(king_sq) => self.attackers_to_square(king_sq, color.opponent()),
            None => Bitboard(0),
        }
    }

    /// Recompute and store `self.checkers` for the side to move.
    pub(crate) fn refresh_checkers(&mut self) {
        self.checkers = self.checkers_for(self.current_color());
    }

    #[must_use]
    pub fn generate_moves(&mut self) -> MoveList {
        let current_color = self.current_color();
        let opponent_color = current_color.opponent();
        let pseudo_moves = self.generate_pseudo_moves();
        let mut legal_moves = MoveList::new();

        for m in pseudo_moves.iter() {
            if m.is_castling() {
                let king_start_sq = m.from();
                let mid_file = (m.from().file() + m.to().file()) / 2;
                let king_mid_sq = Square::new(m.from().rank(), mid_file);
                let king_end_sq = m.to();

                if self.is_square_attacked(king_start_sq, opponent_color)
                    || self.is_square_attacked(king_mid_sq, opponent_color)
                    || self.is_square_attacked(king_end_sq, opponent_color)
                {
                    continue;
                }
            }

            let info = self.make_move(*m);
            if !self.is_in_check(current_color) {
                legal_moves.push(*m);
            }
            self.unmake_move(*m, info);
        }
        legal_moves
    }

    #[must_use]
    pub fn is_checkmate(&mut self) -> bool {
        let color = self.current_color();
        self.is_in_check(color) && self.generate_moves().is_empty()
    }

    #[must_use]
    pub fn is_stalemate(&mut self) -> bool {
        let color = self.current_color();
        !self.is_in_check(color) && self.generate_moves().is_empty()
    }

    pub(crate) fn generate_tactical_moves(&mut self) -> MoveList {
        let current_color = self.current_color();
        let c_idx = current_color.index();
        let mut pseudo = MoveList::new();

        for from in self.pieces[c_idx][Piece::Pawn.index()].iter() {
            self.generate_pawn_tactical_moves(from, &mut pseudo);
        }

        for piece in [
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ] {
            for from in self.pieces[c_idx][piece.index()].iter() {
                for m in self.generate_piece_moves(from, piece).iter() {
                    if m.is_capture() {
                        pseudo.push(*m);
                    }
                }
            }
        }

        let mut legal = MoveList::new();
        for m in pseudo.iter() {
            let info = self.make_move(*m);
            if !self.is_in_check(current_color) {
                legal.push(*m);
            }
            self.unmake_move(*m, info);
        }
        legal
    }

    /// Legal quiet moves that give check, used by quiescence's checking-move
    /// stage. Captures are excluded (they're already covered by the capture
    /// stage); castling is excluded since its checking status needs the
    /// rook's destination attacks, not the king's, and it's rare enough at
    /// qsearch depth not to be worth the extra bookkeeping.
    pub(crate) fn generate_quiet_checking_moves(&mut self) -> MoveList {
        let current_color = self.current_color();
        let opponent_color = current_color.opponent();
        let pseudo_moves = self.generate_pseudo_moves();
        let mut checking_moves = MoveList::new();

        for m in pseudo_moves.iter() {
            if m.is_castling() || m.is_capture() {
                continue;
            }
            let info = self.make_move(*m);
            let legal = !self.is_in_check(current_color);
            let gives_check = legal && self.is_in_check(opponent_color);
            self.unmake_move(*m, info);
            if gives_check {
                checking_moves.push(*m);
            }
        }
        checking_moves
    }

    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }

        let moves = self.generate_moves();
        if depth == 1 {
            return moves.len() as u64;
        }

        let mut nodes = 0;
        for m in moves.iter() {
            let info = self.make_move(*m);
            nodes += self.perft(depth - 1);
            self.unmake_move(*m, info);
        }
        nodes
    }
}
