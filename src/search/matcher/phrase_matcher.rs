use crate::error::Result;
use crate::index::posting::SegPostingList;
use crate::search::matcher::Matcher;
use crate::search::similarity::Similarity;

/// Matches documents where the terms of its posting lists occur at
/// consecutive positions, in order.
#[derive(Debug)]
pub struct PhraseMatcher {
    plists: Vec<SegPostingList>,
    weight: f32,
    sim: Similarity,
    doc_id: i32,
    phrase_freq: u32,
    exhausted: bool,
}

impl PhraseMatcher {
    /// `plists` holds one posting list per phrase term, in phrase order.
    pub fn new(plists: Vec<SegPostingList>, weight: f32) -> Self {
        PhraseMatcher {
            exhausted: plists.is_empty(),
            plists,
            weight,
            sim: Similarity::new(),
            doc_id: 0,
            phrase_freq: 0,
        }
    }

    /// Occurrences of the whole phrase in the current document.
    pub fn phrase_freq(&self) -> u32 {
        self.phrase_freq
    }

    fn exhaust(&mut self) -> i32 {
        self.exhausted = true;
        self.doc_id = 0;
        self.phrase_freq = 0;
        0
    }

    /// Starting from the first list's current document, find the first
    /// document holding the phrase.
    fn seek_phrase(&mut self, mut candidate: i32) -> Result<i32> {
        loop {
            if candidate == 0 {
                return Ok(self.exhaust());
            }

            let mut agreed = true;
            for plist in self.plists.iter_mut().skip(1) {
                let mut doc_id = plist.doc_id();
                if doc_id < candidate {
                    doc_id = plist.advance(candidate)?;
                }
                if doc_id == 0 {
                    return Ok(self.exhaust());
                }
                if doc_id > candidate {
                    candidate = doc_id;
                    agreed = false;
                    break;
                }
            }
            if !agreed {
                candidate = self.plists[0].advance(candidate)?;
                continue;
            }

            let phrase_freq = self.calc_phrase_freq();
            if phrase_freq > 0 {
                self.doc_id = candidate;
                self.phrase_freq = phrase_freq;
                return Ok(candidate);
            }
            candidate = self.plists[0].next()?;
        }
    }

    /// Count the positions of the first term which the remaining terms
    /// follow one step at a time.
    fn calc_phrase_freq(&self) -> u32 {
        let mut anchors: Vec<u32> = self.plists[0].positions().to_vec();
        for (offset, plist) in self.plists.iter().enumerate().skip(1) {
            let positions = plist.positions();
            anchors.retain(|&anchor| positions.binary_search(&(anchor + offset as u32)).is_ok());
            if anchors.is_empty() {
                break;
            }
        }
        anchors.len() as u32
    }
}

impl Matcher for PhraseMatcher {
    fn next(&mut self) -> Result<i32> {
        if self.exhausted {
            return Ok(0);
        }
        let candidate = self.plists[0].next()?;
        self.seek_phrase(candidate)
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        if self.exhausted {
            return Ok(0);
        }
        let candidate = self.plists[0].advance(target)?;
        self.seek_phrase(candidate)
    }

    fn doc_id(&self) -> i32 {
        self.doc_id
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.sim.tf(self.phrase_freq) * self.weight)
    }
}
